//! # Bridge Configuration System
//!
//! Layered configuration for the method bridge: compiled defaults, an optional
//! `bridge.toml`, an optional environment-specific `bridge.<env>.toml`, and
//! finally `BRIDGE__*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bridge_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().pending_timeout();
//! let token = manager.config().picker.request_token;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::request_tokens;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/bridge.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// How long a deferred operation may stay parked before it is failed with a timeout
    pub pending_timeout_ms: u64,

    /// Spawn a tokio deadline task per parked operation when a runtime is available
    pub spawn_deadline_tasks: bool,

    /// Image picker flow settings
    pub picker: PickerConfig,

    /// Dispatcher settings
    pub dispatch: DispatchConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            pending_timeout_ms: 300_000,
            spawn_deadline_tasks: true,
            picker: PickerConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn pending_timeout(&self) -> Duration {
        Duration::from_millis(self.pending_timeout_ms)
    }

    /// Set the pending operation deadline
    pub fn with_pending_timeout(mut self, timeout: Duration) -> Self {
        self.pending_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Enable or disable per-operation deadline tasks
    pub fn with_deadline_tasks(mut self, enabled: bool) -> Self {
        self.spawn_deadline_tasks = enabled;
        self
    }

    /// Set the request token used by the image picker
    pub fn with_picker_token(mut self, token: i32) -> Self {
        self.picker.request_token = token;
        self
    }

    /// Reject values the bridge cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.pending_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "pending_timeout_ms",
                "0",
                "deferred operations need a non-zero deadline",
            ));
        }
        if self.picker.data_type_filter.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "picker.data_type_filter",
                &self.picker.data_type_filter,
                "the picker needs a MIME type filter",
            ));
        }
        if self.dispatch.enable_history && self.dispatch.max_history_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "dispatch.max_history_size",
                "0",
                "history is enabled but cannot hold any entries",
            ));
        }
        Ok(())
    }
}

/// Image picker flow configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Token the host echoes back when the picker concludes
    pub request_token: i32,
    /// Title shown on the chooser
    pub chooser_title: String,
    /// MIME filter applied to both the content and the pick request
    pub data_type_filter: String,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            request_token: request_tokens::PICK_IMAGE,
            chooser_title: "Select Image".to_string(),
            data_type_filter: "image/*".to_string(),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Record each dispatch in a bounded history
    pub enable_history: bool,
    /// Maximum number of dispatch records kept
    pub max_history_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enable_history: true,
            max_history_size: 1000,
        }
    }
}
