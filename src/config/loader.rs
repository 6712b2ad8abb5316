//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles file discovery,
//! environment detection, and layering of overrides through the `config` crate.

use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ConfigResult, ConfigurationError};
use super::BridgeConfig;

const BASE_FILE: &str = "bridge.toml";
const ENV_PREFIX: &str = "BRIDGE";
const ENV_SEPARATOR: &str = "__";

/// Loaded configuration plus the context it was loaded in
#[derive(Debug)]
pub struct ConfigManager {
    config: BridgeConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    /// This is useful for testing without modifying global environment variables
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading bridge configuration"
        );

        let config = Self::load_layers(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            pending_timeout_ms = config.pending_timeout_ms,
            picker_token = config.picker.request_token,
            "Bridge configuration loaded"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration (after validating it)
    pub fn from_config(config: BridgeConfig, environment: &str) -> ConfigResult<Arc<ConfigManager>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Detect current environment from environment variables
    pub fn detect_environment() -> String {
        env::var("BRIDGE_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn load_layers(config_directory: &Path, environment: &str) -> ConfigResult<BridgeConfig> {
        let base = config_directory.join(BASE_FILE);
        let overlay = config_directory.join(format!("bridge.{environment}.toml"));

        let merged = Config::builder()
            .add_source(File::from(base.as_path()).format(FileFormat::Toml).required(false))
            .add_source(File::from(overlay.as_path()).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::LoadError {
                directory: config_directory.to_path_buf(),
                error: e.to_string(),
            })?;

        merged
            .try_deserialize::<BridgeConfig>()
            .map_err(|e| ConfigurationError::DeserializeError {
                error: e.to_string(),
            })
    }
}
