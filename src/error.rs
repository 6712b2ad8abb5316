//! Error types for the bridge.
//!
//! `BridgeError` is the structured failure carried back to callers through a
//! completion handle. Every variant maps to a stable wire code so the UI side
//! can branch on it without parsing messages.

use thiserror::Error;

use crate::config::ConfigurationError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("External flow unavailable: {0}")]
    ExternalFlowUnavailable(String),
    #[error("Operation already pending for request token {token}")]
    AlreadyPending { token: i32 },
    #[error("Operation cancelled")]
    Cancelled,
    #[error("Operation timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("Subsystem failure: {cause}")]
    SubsystemFailure { cause: String },
    #[error("Method not implemented: {method}")]
    MethodNotImplemented { method: String },
    #[error("Completion handle dropped without a result")]
    HandleDropped,
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BridgeError {
    pub fn subsystem(cause: impl Into<String>) -> Self {
        BridgeError::SubsystemFailure {
            cause: cause.into(),
        }
    }

    /// Stable code sent across the dispatch boundary
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArguments(_) => "INVALID_ARGUMENTS",
            BridgeError::ExternalFlowUnavailable(_) => "EXTERNAL_FLOW_UNAVAILABLE",
            BridgeError::AlreadyPending { .. } => "ALREADY_PENDING",
            BridgeError::Cancelled => "CANCELLED",
            BridgeError::Timeout { .. } => "TIMEOUT",
            BridgeError::SubsystemFailure { .. } => "SUBSYSTEM_FAILURE",
            BridgeError::MethodNotImplemented { .. } => "NOT_IMPLEMENTED",
            BridgeError::HandleDropped => "HANDLE_DROPPED",
            BridgeError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

impl From<ConfigurationError> for BridgeError {
    fn from(error: ConfigurationError) -> Self {
        BridgeError::Configuration(error.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(error: serde_json::Error) -> Self {
        BridgeError::InvalidArguments(format!("JSON serialization error: {error}"))
    }
}

pub type BridgeResult<T> = Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let errors = vec![
            BridgeError::InvalidArguments("x".into()),
            BridgeError::ExternalFlowUnavailable("x".into()),
            BridgeError::AlreadyPending { token: 1 },
            BridgeError::Cancelled,
            BridgeError::Timeout { after_ms: 1 },
            BridgeError::subsystem("x"),
            BridgeError::MethodNotImplemented { method: "x".into() },
            BridgeError::HandleDropped,
            BridgeError::Configuration("x".into()),
        ];
        let mut codes: Vec<_> = errors.iter().map(BridgeError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = BridgeError::AlreadyPending { token: 42 };
        assert_eq!(
            err.to_string(),
            "Operation already pending for request token 42"
        );
        assert_eq!(
            BridgeError::subsystem("disk full").to_string(),
            "Subsystem failure: disk full"
        );
    }
}
