//! Configuration Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors with detailed context
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A layered source could not be read or merged
    #[error("Failed to load configuration from {directory}: {error}")]
    LoadError { directory: PathBuf, error: String },

    /// The merged configuration does not fit the expected shape
    #[error("Failed to deserialize configuration: {error}")]
    DeserializeError { error: String },

    /// Invalid configuration value
    #[error("Invalid value '{value}' for field '{field}': {context}")]
    InvalidValue {
        field: String,
        value: String,
        context: String,
    },
}

impl ConfigurationError {
    pub fn invalid_value(field: &str, value: &str, context: &str) -> Self {
        ConfigurationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            context: context.to_string(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
