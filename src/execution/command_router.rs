//! # Method Dispatcher
//!
//! Routes an incoming [`MethodCall`] to the [`CommandHandler`] registered for
//! its method name. Handlers are registered at startup and may be replaced or
//! removed by the host at runtime.
//!
//! ```rust
//! use bridge_core::execution::{CommandArguments, CompletionHandle, MethodCall};
//! use bridge_core::test_helpers::TestHost;
//!
//! let host = TestHost::new();
//! let call = MethodCall::new("no-such-method", CommandArguments::new());
//! let (handle, mut receiver) = CompletionHandle::channel(call.method.clone(), call.call_id);
//! host.bridge.dispatcher().dispatch(call, handle);
//! assert!(receiver.try_result().unwrap().is_err());
//! ```

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::command::{BridgeContext, CommandHandler, CompletionMode, MethodCall};
use super::completion::CompletionHandle;
use crate::config::DispatchConfig;
use crate::error::BridgeError;
use crate::logging::log_method_call;

/// How a dispatched call left the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The handler completed the call before returning
    Completed,
    /// The handler parked the call; the result arrives later
    Deferred,
    /// The dispatcher refused the call and completed it with an error
    Rejected,
}

/// Dispatch record for history tracking; serializes with an RFC 3339 timestamp
#[derive(Debug, Clone, Serialize)]
pub struct DispatchRecord {
    pub call_id: Uuid,
    pub method: String,
    pub status: DispatchStatus,
    pub timestamp: DateTime<Utc>,
    pub elapsed_us: u64,
}

/// Dispatcher statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherStats {
    pub registered_handlers: usize,
    pub total_dispatched: u64,
    pub completed_synchronously: u64,
    pub deferred: u64,
    pub rejected: u64,
    pub history_enabled: bool,
}

#[derive(Debug, Default)]
struct DispatchCounters {
    total: AtomicU64,
    completed: AtomicU64,
    deferred: AtomicU64,
    rejected: AtomicU64,
}

/// Central method routing and dispatch
pub struct MethodDispatcher {
    /// Registry of command handlers by method name
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,

    /// Collaborators handed to every handler
    context: BridgeContext,

    /// Bounded dispatch history for debugging
    history: Mutex<VecDeque<DispatchRecord>>,

    counters: DispatchCounters,

    config: DispatchConfig,
}

impl MethodDispatcher {
    pub fn new(context: BridgeContext) -> Self {
        let config = context.config().dispatch.clone();
        Self {
            handlers: RwLock::new(HashMap::new()),
            context,
            history: Mutex::new(VecDeque::new()),
            counters: DispatchCounters::default(),
            config,
        }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.context
    }

    /// Register a handler under its method name, replacing any previous one
    pub fn register_handler(&self, handler: Arc<dyn CommandHandler>) {
        let method = handler.method_name().to_string();
        let mut handlers = self.handlers.write();

        if handlers.contains_key(&method) {
            warn!(method = %method, "Replacing existing handler");
        }

        info!(
            method = %method,
            mode = ?handler.completion_mode(),
            "Registered command handler"
        );
        handlers.insert(method, handler);
    }

    /// Unregister a handler
    pub fn unregister_handler(&self, method: &str) -> bool {
        let removed = self.handlers.write().remove(method).is_some();

        if removed {
            info!(method = %method, "Unregistered command handler");
        } else {
            warn!(method = %method, "Attempted to unregister non-existent handler");
        }

        removed
    }

    pub fn has_handler(&self, method: &str) -> bool {
        self.handlers.read().contains_key(method)
    }

    pub fn registered_methods(&self) -> Vec<String> {
        let mut methods: Vec<String> = self.handlers.read().keys().cloned().collect();
        methods.sort();
        methods
    }

    /// Route `call` to its handler. The handle is always answered: by the
    /// handler (now or later) or by the dispatcher when the call is refused.
    pub fn dispatch(&self, call: MethodCall, completion: CompletionHandle) -> DispatchStatus {
        let start = std::time::Instant::now();
        let call_id = call.call_id.to_string();

        debug!(method = %call.method, call_id = %call_id, "Dispatching method call");

        let status = match self.resolve(&call) {
            Ok(handler) => {
                let probe = completion.probe();
                handler.handle(&self.context, &call.arguments, completion);

                match (probe.is_completed(), handler.completion_mode()) {
                    (true, _) => DispatchStatus::Completed,
                    (false, CompletionMode::Deferred) => DispatchStatus::Deferred,
                    (false, CompletionMode::Synchronous) => {
                        error!(
                            method = %call.method,
                            call_id = %call_id,
                            "Synchronous handler returned without completing its call"
                        );
                        DispatchStatus::Deferred
                    }
                }
            }
            Err(e) => {
                warn!(method = %call.method, call_id = %call_id, error = %e, "Method call rejected");
                completion.failure(e);
                DispatchStatus::Rejected
            }
        };

        self.record(&call, status, start.elapsed().as_micros() as u64);
        log_method_call(&call.method, &call_id, status_label(status), None);
        status
    }

    pub fn history(&self) -> Vec<DispatchRecord> {
        self.history.lock().iter().cloned().collect()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
        info!("Dispatch history cleared");
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            registered_handlers: self.handlers.read().len(),
            total_dispatched: self.counters.total.load(Ordering::Relaxed),
            completed_synchronously: self.counters.completed.load(Ordering::Relaxed),
            deferred: self.counters.deferred.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            history_enabled: self.config.enable_history,
        }
    }

    fn resolve(&self, call: &MethodCall) -> Result<Arc<dyn CommandHandler>, BridgeError> {
        if call.method.trim().is_empty() {
            return Err(BridgeError::InvalidArguments(
                "method name cannot be empty".to_string(),
            ));
        }

        self.handlers
            .read()
            .get(&call.method)
            .cloned()
            .ok_or_else(|| BridgeError::MethodNotImplemented {
                method: call.method.clone(),
            })
    }

    fn record(&self, call: &MethodCall, status: DispatchStatus, elapsed_us: u64) {
        self.counters.total.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            DispatchStatus::Completed => &self.counters.completed,
            DispatchStatus::Deferred => &self.counters.deferred,
            DispatchStatus::Rejected => &self.counters.rejected,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if !self.config.enable_history {
            return;
        }

        let mut history = self.history.lock();
        history.push_back(DispatchRecord {
            call_id: call.call_id,
            method: call.method.clone(),
            status,
            timestamp: Utc::now(),
            elapsed_us,
        });
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }
    }
}

fn status_label(status: DispatchStatus) -> &'static str {
    match status {
        DispatchStatus::Completed => "completed",
        DispatchStatus::Deferred => "deferred",
        DispatchStatus::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::execution::command::CommandArguments;
    use crate::execution::completion::CompletionReceiver;
    use crate::execution::continuation_router::ContinuationRouter;
    use crate::execution::pending_slot::PendingOperationSlot;
    use crate::test_helpers::{RecordingFlowLauncher, RecordingNotificationSink};
    use serde_json::json;

    struct EchoHandler;

    impl CommandHandler for EchoHandler {
        fn method_name(&self) -> &str {
            "echo"
        }

        fn completion_mode(&self) -> CompletionMode {
            CompletionMode::Synchronous
        }

        fn handle(
            &self,
            _context: &BridgeContext,
            arguments: &CommandArguments,
            completion: CompletionHandle,
        ) {
            completion.success(arguments.get("value").cloned().unwrap_or(json!(null)));
        }
    }

    /// Breaks the synchronous contract by stashing the handle
    struct LeakyHandler {
        stash: Mutex<Vec<CompletionHandle>>,
    }

    impl CommandHandler for LeakyHandler {
        fn method_name(&self) -> &str {
            "leaky"
        }

        fn completion_mode(&self) -> CompletionMode {
            CompletionMode::Synchronous
        }

        fn handle(&self, _: &BridgeContext, _: &CommandArguments, completion: CompletionHandle) {
            self.stash.lock().push(completion);
        }
    }

    fn dispatcher(config: BridgeConfig) -> MethodDispatcher {
        let config = Arc::new(config);
        let router = Arc::new(ContinuationRouter::new(
            Arc::new(PendingOperationSlot::new()),
            &config,
        ));
        MethodDispatcher::new(BridgeContext::new(
            config,
            router,
            Arc::new(RecordingFlowLauncher::new()),
            Arc::new(RecordingNotificationSink::new()),
        ))
    }

    fn make_call(
        method: &str,
        arguments: CommandArguments,
    ) -> (MethodCall, CompletionHandle, CompletionReceiver) {
        let call = MethodCall::new(method, arguments);
        let (handle, rx) = CompletionHandle::channel(call.method.clone(), call.call_id);
        (call, handle, rx)
    }

    #[test]
    fn test_registration() {
        let dispatcher = dispatcher(BridgeConfig::default());
        dispatcher.register_handler(Arc::new(EchoHandler));

        assert!(dispatcher.has_handler("echo"));
        assert!(!dispatcher.has_handler("pick-image"));
        assert_eq!(dispatcher.registered_methods(), vec!["echo".to_string()]);

        assert!(dispatcher.unregister_handler("echo"));
        assert!(!dispatcher.unregister_handler("echo"));
    }

    #[test]
    fn test_synchronous_dispatch() {
        let dispatcher = dispatcher(BridgeConfig::default());
        dispatcher.register_handler(Arc::new(EchoHandler));

        let (call, handle, mut rx) = make_call("echo", CommandArguments::new().with("value", 5));
        assert_eq!(dispatcher.dispatch(call, handle), DispatchStatus::Completed);
        assert_eq!(rx.try_result(), Some(Ok(json!(5))));
    }

    #[test]
    fn test_unknown_method_not_implemented() {
        let dispatcher = dispatcher(BridgeConfig::default());
        let (call, handle, mut rx) = make_call("does-not-exist", CommandArguments::new());

        assert_eq!(dispatcher.dispatch(call, handle), DispatchStatus::Rejected);
        assert_eq!(
            rx.try_result(),
            Some(Err(BridgeError::MethodNotImplemented {
                method: "does-not-exist".to_string()
            }))
        );
    }

    #[test]
    fn test_empty_method_is_invalid() {
        let dispatcher = dispatcher(BridgeConfig::default());
        let (call, handle, mut rx) = make_call("  ", CommandArguments::new());

        assert_eq!(dispatcher.dispatch(call, handle), DispatchStatus::Rejected);
        assert!(matches!(
            rx.try_result(),
            Some(Err(BridgeError::InvalidArguments(_)))
        ));
    }

    #[test]
    fn test_synchronous_contract_violation_is_reported() {
        let dispatcher = dispatcher(BridgeConfig::default());
        let leaky = Arc::new(LeakyHandler {
            stash: Mutex::new(Vec::new()),
        });
        dispatcher.register_handler(leaky.clone());

        let (call, handle, mut rx) = make_call("leaky", CommandArguments::new());
        assert_eq!(dispatcher.dispatch(call, handle), DispatchStatus::Deferred);
        assert!(rx.try_result().is_none());

        leaky.stash.lock().clear();
        assert_eq!(rx.try_result(), Some(Err(BridgeError::HandleDropped)));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut config = BridgeConfig::default();
        config.dispatch.max_history_size = 3;
        let dispatcher = dispatcher(config);
        dispatcher.register_handler(Arc::new(EchoHandler));

        for _ in 0..5 {
            let (call, handle, _rx) = make_call("echo", CommandArguments::new());
            dispatcher.dispatch(call, handle);
        }

        assert_eq!(dispatcher.history().len(), 3);
        let stats = dispatcher.stats();
        assert_eq!(stats.total_dispatched, 5);
        assert_eq!(stats.completed_synchronously, 5);
        assert_eq!(stats.rejected, 0);

        dispatcher.clear_history();
        assert!(dispatcher.history().is_empty());
    }

    #[test]
    fn test_history_exports_as_json() {
        let dispatcher = dispatcher(BridgeConfig::default());
        dispatcher.register_handler(Arc::new(EchoHandler));

        let (call, handle, _rx) = make_call("echo", CommandArguments::new());
        let call_id = call.call_id;
        dispatcher.dispatch(call, handle);
        let (call, handle, _rx) = make_call("missing", CommandArguments::new());
        dispatcher.dispatch(call, handle);

        let history = dispatcher.history();
        let exported = serde_json::to_value(&history).unwrap();
        let records = exported.as_array().unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0]["call_id"], json!(call_id.to_string()));
        assert_eq!(records[0]["method"], json!("echo"));
        assert_eq!(records[0]["status"], json!("completed"));
        assert_eq!(records[1]["status"], json!("rejected"));

        let timestamp = records[0]["timestamp"].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(timestamp).unwrap();
        assert_eq!(parsed.with_timezone(&Utc), history[0].timestamp);
        assert!(records[0]["elapsed_us"].is_u64());
    }

    #[test]
    fn test_history_disabled() {
        let mut config = BridgeConfig::default();
        config.dispatch.enable_history = false;
        let dispatcher = dispatcher(config);

        let (call, handle, _rx) = make_call("missing", CommandArguments::new());
        dispatcher.dispatch(call, handle);

        assert!(dispatcher.history().is_empty());
        assert_eq!(dispatcher.stats().rejected, 1);
        assert!(!dispatcher.stats().history_enabled);
    }
}
