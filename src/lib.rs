#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Bridge Core
//!
//! Method-call dispatch bridge between a UI layer and a native host, with an
//! asynchronous continuation core.
//!
//! ## Overview
//!
//! The UI side invokes named methods with JSON arguments and receives exactly
//! one reply per call. Some methods answer immediately. Others start a
//! long-lived flow on the host (such as an image picker) and answer only when
//! the host reports that flow's outcome, possibly much later and on another
//! thread.
//!
//! ## Architecture
//!
//! - [`execution::MethodDispatcher`] routes each call to a
//!   [`execution::CommandHandler`] registered for its method name
//! - [`execution::PendingOperationSlot`] holds at most one parked completion
//!   handle per request token
//! - [`execution::ContinuationRouter`] receives host flow results, matches them
//!   against the slot and completes the parked handle exactly once, or fails it
//!   with a timeout when no result arrives in time
//! - [`bridge::MethodBridge`] wires all of the above together
//!
//! ## Module Organization
//!
//! - [`bridge`] - Facade used by hosts
//! - [`execution`] - Dispatch, completion handles, slot and continuation router
//! - [`platform`] - Host traits for launching flows and posting notifications
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//! - [`constants`] - Method names, request tokens and host result codes
//!
//! ## Quick Start
//!
//! ```rust
//! use bridge_core::constants::result_codes;
//! use bridge_core::execution::{CommandArguments, Delivery};
//! use bridge_core::test_helpers::{ReplyCollector, TestHost};
//!
//! let host = TestHost::new();
//! let replies = ReplyCollector::new();
//!
//! host.bridge.invoke("pick-image", CommandArguments::new(), replies.callback());
//! assert!(replies.is_empty());
//!
//! let token = host.launcher.last_request().unwrap().request_token;
//! let delivery = host.bridge.on_flow_result(
//!     token,
//!     result_codes::RESULT_OK,
//!     Some("content://media/external/images/media/3".to_string()),
//! );
//! assert_eq!(delivery, Delivery::Delivered);
//! assert!(replies.single().is_ok());
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and doc tests
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod logging;
pub mod platform;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use bridge::MethodBridge;
pub use config::{BridgeConfig, ConfigManager, ConfigurationError};
pub use error::{BridgeError, BridgeResult};
pub use execution::{
    CommandArguments, CommandHandler, CompletionHandle, ContinuationRouter, Delivery,
    MethodCall, MethodDispatcher, MethodReply, MethodResult, PendingOperationSlot,
};
pub use logging::init_structured_logging;
pub use platform::{
    ExternalFlowLauncher, FlowOutcome, FlowRequest, LaunchError, Notification, NotificationSink,
    NotifyError,
};
