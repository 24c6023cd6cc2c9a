pub mod app;
pub mod config;
pub mod error;
pub mod lifecycle;

pub use app::App;
pub use config::{
    Config, EndpointsConfig, ModelConfig, TemperatureUnit, ValidationResult, WeatherConfig,
    API_KEY_ENV,
};
pub use error::{
    AppError, ConfigError, ErrorKind, NetworkError, PredictionError, ReqwestErrorExt,
    WeatherError,
};
pub use lifecycle::{Failure, Lifecycle, Stage, TransitionError};

use anyhow::Result;

/// Initialize logging for the host process
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    tracing::debug!("wxcast core initialized");
    Ok(())
}
