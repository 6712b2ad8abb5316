// Test Helpers Module - host doubles and setup shared by unit, integration and doc tests.
//
// The doubles record every request the bridge makes of the host so tests can
// assert on them, and can be switched into failure mode to exercise the
// launch and notification error paths.

pub mod host_doubles;
pub mod shared_test_setup;

pub use host_doubles::{RecordingFlowLauncher, RecordingNotificationSink, ReplyCollector};
pub use shared_test_setup::TestHost;
