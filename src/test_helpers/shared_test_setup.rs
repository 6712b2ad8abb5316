use std::sync::Arc;

use crate::bridge::MethodBridge;
use crate::config::BridgeConfig;
use crate::error::BridgeResult;

use super::host_doubles::{RecordingFlowLauncher, RecordingNotificationSink};

/// A bridge with default handlers wired to recording host doubles
#[derive(Debug)]
pub struct TestHost {
    pub bridge: MethodBridge,
    pub launcher: Arc<RecordingFlowLauncher>,
    pub notifier: Arc<RecordingNotificationSink>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default()).expect("default configuration is valid")
    }

    /// Deadlines only through `expire_overdue`; keeps tests free of timer tasks
    pub fn without_deadline_tasks() -> Self {
        Self::with_config(BridgeConfig::default().with_deadline_tasks(false))
            .expect("default configuration is valid")
    }

    pub fn with_config(config: BridgeConfig) -> BridgeResult<Self> {
        let launcher = Arc::new(RecordingFlowLauncher::new());
        let notifier = Arc::new(RecordingNotificationSink::new());
        let bridge = MethodBridge::with_default_handlers(
            config,
            Arc::clone(&launcher) as _,
            Arc::clone(&notifier) as _,
        )?;

        Ok(Self {
            bridge,
            launcher,
            notifier,
        })
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}
