use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, ValidationResult};
use crate::error::ConfigError;

/// Host-level state: the validated configuration and the resolved API key.
pub struct App {
    config: Arc<Config>,
    validation: ValidationResult,
    api_key: Option<String>,
}

impl App {
    /// Create a new application instance from the default or an explicit config file
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let (config, validation) = Config::load_validated(config_path)?;
        Ok(Self::with_config(config, validation))
    }

    pub fn with_config(config: Config, validation: ValidationResult) -> Self {
        let api_key = config.api_key();
        if api_key.is_none() {
            tracing::warn!("No API key configured; prediction commands are unavailable");
        }

        Self {
            config: Arc::new(config),
            validation,
            api_key,
        }
    }

    /// Fail fast when a command needs the generative endpoint but no key is configured.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ConfigError::MissingCredential(crate::config::API_KEY_ENV.to_string()))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<Config> {
        self.config.clone()
    }

    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }
}
