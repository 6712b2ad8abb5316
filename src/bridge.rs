//! # Method Bridge
//!
//! Wires configuration, the pending slot, the continuation router and the
//! dispatcher together behind the two entry points the host needs:
//!
//! - the dispatch boundary ([`MethodBridge::invoke`] / [`MethodBridge::call`])
//! - the external-flow completion callback ([`MethodBridge::on_flow_result`])
//!
//! ```rust
//! use bridge_core::execution::CommandArguments;
//! use bridge_core::test_helpers::TestHost;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let host = TestHost::new();
//! let reply = host
//!     .bridge
//!     .call(
//!         "create-socket-issue-warning",
//!         CommandArguments::new().with("CHANNEL_ID", "socket_errors"),
//!     )
//!     .await;
//! assert_eq!(reply, Ok(serde_json::json!("")));
//! assert_eq!(host.notifier.posted().len(), 1);
//! # }
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{BridgeConfig, ConfigManager};
use crate::error::{BridgeError, BridgeResult};
use crate::execution::{
    BridgeContext, CommandArguments, CommandHandler, CompletionHandle, ContinuationRouter,
    Delivery, DispatchStatus, MethodCall, MethodDispatcher, MethodReply, MethodResult,
    PendingOperationSlot, PickImageHandler, RequestToken, SocketIssueWarningHandler,
};
use crate::platform::{ExternalFlowLauncher, FlowOutcome, NotificationSink};

pub struct MethodBridge {
    config: Arc<BridgeConfig>,
    continuations: Arc<ContinuationRouter>,
    dispatcher: MethodDispatcher,
}

impl MethodBridge {
    /// Build a bridge with no handlers registered
    pub fn new(
        config: BridgeConfig,
        flow_launcher: Arc<dyn ExternalFlowLauncher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> BridgeResult<Self> {
        config.validate()?;

        let config = Arc::new(config);
        let slot = Arc::new(PendingOperationSlot::new());
        let continuations = Arc::new(ContinuationRouter::new(slot, &config));
        let context = BridgeContext::new(
            Arc::clone(&config),
            Arc::clone(&continuations),
            flow_launcher,
            notifier,
        );

        Ok(Self {
            config,
            continuations,
            dispatcher: MethodDispatcher::new(context),
        })
    }

    /// Build a bridge with `pick-image` and `create-socket-issue-warning` registered
    pub fn with_default_handlers(
        config: BridgeConfig,
        flow_launcher: Arc<dyn ExternalFlowLauncher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> BridgeResult<Self> {
        let bridge = Self::new(config, flow_launcher, notifier)?;
        bridge.register_default_handlers();
        Ok(bridge)
    }

    /// Build from a loaded [`ConfigManager`] with the default handlers
    pub fn from_config_manager(
        manager: &ConfigManager,
        flow_launcher: Arc<dyn ExternalFlowLauncher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> BridgeResult<Self> {
        info!(environment = %manager.environment(), "Creating method bridge");
        Self::with_default_handlers(manager.config().clone(), flow_launcher, notifier)
    }

    pub fn register_default_handlers(&self) {
        self.dispatcher
            .register_handler(Arc::new(SocketIssueWarningHandler::new()));
        self.dispatcher.register_handler(Arc::new(PickImageHandler::new()));
    }

    pub fn register_handler(&self, handler: Arc<dyn CommandHandler>) {
        self.dispatcher.register_handler(handler);
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &MethodDispatcher {
        &self.dispatcher
    }

    pub fn continuations(&self) -> &Arc<ContinuationRouter> {
        &self.continuations
    }

    pub fn slot(&self) -> &Arc<PendingOperationSlot> {
        self.continuations.slot()
    }

    /// Dispatch a prepared call with a caller-supplied handle
    pub fn dispatch_call(&self, call: MethodCall, completion: CompletionHandle) -> DispatchStatus {
        self.dispatcher.dispatch(call, completion)
    }

    /// Dispatch boundary in callback form: `callback` receives the wire reply exactly once
    pub fn invoke<F>(&self, method: &str, arguments: CommandArguments, callback: F) -> DispatchStatus
    where
        F: FnOnce(MethodReply) + Send + 'static,
    {
        let call = MethodCall::new(method, arguments);
        let completion = CompletionHandle::from_reply_callback(method, call.call_id, callback);
        self.dispatch_call(call, completion)
    }

    /// Like [`invoke`](Self::invoke) but with untyped JSON arguments.
    /// Anything other than an object or `null` is answered with `INVALID_ARGUMENTS`.
    pub fn invoke_json<F>(&self, method: &str, arguments: Value, callback: F) -> DispatchStatus
    where
        F: FnOnce(MethodReply) + Send + 'static,
    {
        match CommandArguments::from_json(arguments) {
            Ok(arguments) => self.invoke(method, arguments, callback),
            Err(e) => {
                warn!(method = %method, error = %e, "Method call rejected before dispatch");
                callback(MethodReply::from(Err::<Value, BridgeError>(e)));
                DispatchStatus::Rejected
            }
        }
    }

    /// Dispatch boundary in async form; resolves once the call completes
    pub async fn call(&self, method: &str, arguments: CommandArguments) -> MethodResult {
        let call = MethodCall::new(method, arguments);
        let (completion, receiver) = CompletionHandle::channel(method, call.call_id);
        self.dispatch_call(call, completion);
        receiver.await
    }

    /// Host callback for a concluded external flow
    pub fn on_flow_result(
        &self,
        token: RequestToken,
        result_code: i32,
        payload: Option<String>,
    ) -> Delivery {
        self.continuations.on_flow_result(token, result_code, payload)
    }

    pub fn on_external_event(&self, token: RequestToken, outcome: FlowOutcome) -> Delivery {
        self.continuations.on_external_event(token, outcome)
    }

    /// Fail operations parked past the pending timeout
    pub fn expire_overdue(&self) -> usize {
        self.continuations.expire_overdue()
    }

    /// Fail every parked operation. Returns how many were failed.
    pub fn shutdown(&self) -> usize {
        let failed = self.continuations.shutdown();
        info!(failed_pending = failed, "Method bridge shut down");
        failed
    }
}

impl fmt::Debug for MethodBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBridge")
            .field("config", &self.config)
            .field("methods", &self.dispatcher.registered_methods())
            .field("pending", &self.slot().len())
            .finish()
    }
}
