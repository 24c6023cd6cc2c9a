use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable that supplies the generative endpoint key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature unit used for archive queries and prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    Celsius,
    #[default]
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// Value for the archive `temperature_unit` parameter.
    ///
    /// Celsius is the endpoint default, so the parameter is omitted for it.
    pub fn query_param(&self) -> Option<&'static str> {
        match self {
            Self::Celsius => None,
            Self::Fahrenheit => Some("fahrenheit"),
        }
    }

    /// The other unit, for prompts that ask for both.
    pub fn secondary(&self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

impl std::str::FromStr for TemperatureUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "c" | "celsius" => Ok(Self::Celsius),
            "f" | "fahrenheit" => Ok(Self::Fahrenheit),
            other => Err(ConfigError::Invalid(format!(
                "unknown temperature unit: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Generative endpoint key. `GEMINI_API_KEY` in the environment wins over this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub endpoints: EndpointsConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointsConfig {
    pub geocoding_url: String,
    pub archive_url: String,
    /// Base URL; the model name and `:generateContent` are appended.
    pub generative_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            geocoding_url: "https://geocoding-api.open-meteo.com/v1/search".to_string(),
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            generative_url: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    pub name: String,
    pub timeout_secs: u64,
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Upper bound of the random delay added to every backoff
    pub jitter_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            timeout_secs: 30,
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 16_000,
            jitter_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherConfig {
    pub temperature_unit: TemperatureUnit,
    pub timeout_secs: u64,
    /// Prior years scanned for historical strategies
    pub history_years: u32,
    /// Half-width of the window around the same calendar date
    pub window_radius_days: i64,
    /// Length of the trailing window for near-future requests
    pub recent_window_days: i64,
    /// Requests at most this many days ahead use the recent window
    pub near_future_days: i64,
    /// Years compared at each end of a climate span for the trend
    pub trend_years: u32,
    /// Length of the contiguous climate span
    pub span_years: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            temperature_unit: TemperatureUnit::Fahrenheit,
            timeout_secs: 10,
            history_years: 10,
            window_radius_days: 3,
            recent_window_days: 7,
            near_future_days: 7,
            trend_years: 5,
            span_years: 20,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoints: EndpointsConfig::default(),
            model: ModelConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Wrote default config to {}", config_path.display());
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated(path: Option<&Path>) -> Result<(Self, ValidationResult)> {
        let config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load()?,
        };
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.endpoints.geocoding_url, "endpoints.geocoding_url", &mut result);
        self.validate_url(&self.endpoints.archive_url, "endpoints.archive_url", &mut result);
        self.validate_url(
            &self.endpoints.generative_url,
            "endpoints.generative_url",
            &mut result,
        );

        if self.model.name.trim().is_empty() {
            result.add_error("model.name", "Model name must not be empty");
        }
        if self.model.max_attempts == 0 {
            result.add_error("model.max_attempts", "At least one attempt is required");
        } else if self.model.max_attempts > 10 {
            result.add_warning("model.max_attempts", "More than 10 attempts per request");
        }
        if self.model.timeout_secs == 0 {
            result.add_error("model.timeout_secs", "Timeout must be greater than 0");
        }
        if self.model.max_delay_ms < self.model.initial_delay_ms {
            result.add_warning(
                "model.max_delay_ms",
                "Maximum delay is below the initial delay; every retry waits the maximum",
            );
        }

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        }
        if self.weather.history_years == 0 {
            result.add_error("weather.history_years", "At least one prior year is required");
        } else if self.weather.history_years > 30 {
            result.add_warning(
                "weather.history_years",
                "Scanning more than 30 years issues one request per year",
            );
        }
        if self.weather.window_radius_days < 0 {
            result.add_error("weather.window_radius_days", "Radius must not be negative");
        }
        if self.weather.recent_window_days <= 0 {
            result.add_error("weather.recent_window_days", "Window must be at least one day");
        }
        if self.weather.span_years <= self.weather.trend_years * 2 {
            result.add_warning(
                "weather.span_years",
                "Span is too short for a trend comparison; trends will be omitted",
            );
        }

        if self.api_key.as_deref().is_some_and(|k| k.starts_with("YOUR_")) {
            result.add_warning("api_key", "API key looks like a placeholder");
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }
                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// The API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        Self::pick_api_key(std::env::var(API_KEY_ENV).ok(), self.api_key.clone())
    }

    /// Like [`Config::api_key`], but a missing key is a `MissingCredential` error.
    pub fn require_api_key(&self) -> Result<String, ConfigError> {
        self.api_key()
            .ok_or_else(|| ConfigError::MissingCredential(API_KEY_ENV.to_string()))
    }

    fn pick_api_key(env: Option<String>, file: Option<String>) -> Option<String> {
        env.into_iter()
            .chain(file)
            .map(|k| k.trim().to_string())
            .find(|k| !k.is_empty())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wxcast");

        Ok(config_dir.join("config.toml"))
    }
}
