//! Method call model and the command handler contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::completion::CompletionHandle;
use super::continuation_router::ContinuationRouter;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::platform::{ExternalFlowLauncher, NotificationSink};

/// Named request arriving across the dispatch boundary
///
/// # Examples
///
/// ```rust
/// use bridge_core::execution::{CommandArguments, MethodCall};
///
/// let call = MethodCall::new(
///     "create-socket-issue-warning",
///     CommandArguments::new().with("CHANNEL_ID", "socket_errors"),
/// );
/// assert_eq!(call.arguments.require_str("CHANNEL_ID").unwrap(), "socket_errors");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Identifier used to correlate logs for this call
    #[serde(default = "Uuid::new_v4")]
    pub call_id: Uuid,

    /// Method name used to select the handler
    pub method: String,

    /// Arguments supplied by the caller
    #[serde(default)]
    pub arguments: CommandArguments,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: CommandArguments) -> Self {
        Self {
            call_id: Uuid::new_v4(),
            method: method.into(),
            arguments,
        }
    }
}

/// Immutable argument map handed to a command
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandArguments(Map<String, Value>);

impl CommandArguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON value; `null` is treated as no arguments
    pub fn from_json(value: Value) -> BridgeResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self(map)),
            other => Err(BridgeError::InvalidArguments(format!(
                "arguments must be an object, got {other}"
            ))),
        }
    }

    /// Add an argument while building the call
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Required string argument
    pub fn require_str(&self, name: &str) -> BridgeResult<&str> {
        self.optional_str(name)?
            .ok_or_else(|| BridgeError::InvalidArguments(format!("missing argument '{name}'")))
    }

    /// Optional string argument; present-but-not-a-string is an error
    pub fn optional_str(&self, name: &str) -> BridgeResult<Option<&str>> {
        match self.0.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(BridgeError::InvalidArguments(format!(
                "argument '{name}' must be a string, got {other}"
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a handler resolves its completion handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionMode {
    /// The handle is completed before `handle` returns
    Synchronous,
    /// The handle may be parked and completed later by the continuation router
    Deferred,
}

/// Trait for command handlers
///
/// One implementation per supported method name. Synchronous handlers must
/// complete the handle before returning; deferred handlers either complete it
/// or park it with the [`ContinuationRouter`] before returning.
pub trait CommandHandler: Send + Sync {
    /// Method name this handler answers
    fn method_name(&self) -> &str;

    fn completion_mode(&self) -> CompletionMode;

    fn handle(
        &self,
        context: &BridgeContext,
        arguments: &CommandArguments,
        completion: CompletionHandle,
    );
}

/// Collaborators available to handlers
#[derive(Clone)]
pub struct BridgeContext {
    config: Arc<BridgeConfig>,
    continuations: Arc<ContinuationRouter>,
    flow_launcher: Arc<dyn ExternalFlowLauncher>,
    notifier: Arc<dyn NotificationSink>,
}

impl BridgeContext {
    pub fn new(
        config: Arc<BridgeConfig>,
        continuations: Arc<ContinuationRouter>,
        flow_launcher: Arc<dyn ExternalFlowLauncher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            continuations,
            flow_launcher,
            notifier,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn continuations(&self) -> &Arc<ContinuationRouter> {
        &self.continuations
    }

    pub fn flow_launcher(&self) -> &dyn ExternalFlowLauncher {
        self.flow_launcher.as_ref()
    }

    pub fn notifier(&self) -> &dyn NotificationSink {
        self.notifier.as_ref()
    }
}

impl fmt::Debug for BridgeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeContext")
            .field("config", &self.config)
            .field("pending", &self.continuations.slot().len())
            .finish()
    }
}
