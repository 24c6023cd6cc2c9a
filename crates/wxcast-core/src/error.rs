//! Centralized error types for wxcast.
//!
//! This module provides a typed error hierarchy that:
//! - Enables precise error handling at every pipeline stage
//! - Provides short user-facing messages suitable for display
//! - Preserves full error context for debugging/logging

use chrono::NaiveDate;
use thiserror::Error;

/// Flat classification of every failure a pipeline lifecycle can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CityNotFound,
    NetworkError,
    InvalidRange,
    IncompleteData,
    InsufficientHistory,
    PredictionUnavailable,
    MalformedResponse,
    MissingCredential,
    /// Configuration, IO and other failures outside the pipeline taxonomy.
    Other,
}

/// Top-level application error type.
///
/// All errors in wxcast should be convertible to this type.
/// Use `user_message()` to get a display-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Weather data error: {0}")]
    Weather(#[from] WeatherError),

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pipeline error: {0}")]
    Lifecycle(#[from] crate::lifecycle::TransitionError),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display.
    ///
    /// These messages are designed to be actionable and non-technical.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Weather(e) => e.user_message(),
            AppError::Prediction(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Lifecycle(_) => "The request was interrupted. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Network(_) => ErrorKind::NetworkError,
            AppError::Weather(e) => e.kind(),
            AppError::Prediction(e) => e.kind(),
            AppError::Config(e) => e.kind(),
            AppError::Io(_) | AppError::Lifecycle(_) | AppError::Other(_) => ErrorKind::Other,
        }
    }

    /// A fatal error stops the whole host, not just the current request.
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::MissingCredential
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::ServerError { status, .. } if *status >= 500 => {
                "The weather service is experiencing issues. Please try again later."
            }
            NetworkError::ServerError { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }
}

/// Failures of the location and temperature stages.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Invalid date range: {end} is before {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Incomplete archive data: {0}")]
    IncompleteData(String),

    #[error("No usable history in {attempted} yearly requests")]
    InsufficientHistory { attempted: u32 },

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::CityNotFound(_) => {
                "City not found. Check spelling or try a different city."
            }
            WeatherError::InvalidRange { .. } => "The end date must not be before the start date.",
            WeatherError::IncompleteData(_) => {
                "No temperature data is available for that time frame. Try again."
            }
            WeatherError::InsufficientHistory { .. } => {
                "Couldn't get enough historical data for that time period."
            }
            WeatherError::Network(e) => e.user_message(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WeatherError::CityNotFound(_) => ErrorKind::CityNotFound,
            WeatherError::InvalidRange { .. } => ErrorKind::InvalidRange,
            WeatherError::IncompleteData(_) => ErrorKind::IncompleteData,
            WeatherError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            WeatherError::Network(_) => ErrorKind::NetworkError,
        }
    }
}

/// Failures of the generative text stage.
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Retries exhausted or a non-retryable status. `last_response` keeps the
    /// raw body of the final attempt for diagnostics.
    #[error("Prediction unavailable after {attempts} attempt(s) (status {status:?})")]
    Unavailable {
        attempts: u32,
        status: Option<u16>,
        last_response: Option<String>,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Network(#[from] NetworkError),
}

impl PredictionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PredictionError::Unavailable { .. } => {
                "The AI couldn't generate a prediction right now. Try again!"
            }
            PredictionError::MalformedResponse(_) => {
                "The AI returned an unexpected answer. Try again!"
            }
            PredictionError::Network(e) => e.user_message(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PredictionError::Unavailable { .. } => ErrorKind::PredictionUnavailable,
            PredictionError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            PredictionError::Network(_) => ErrorKind::NetworkError,
        }
    }

    /// Raw body of the last failed attempt, if one was received.
    pub fn last_response(&self) -> Option<&str> {
        match self {
            PredictionError::Unavailable { last_response, .. } => last_response.as_deref(),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
            ConfigError::MissingCredential(_) => {
                "Please add GEMINI_API_KEY to your environment or config file!"
            }
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::MissingCredential(_) => ErrorKind::MissingCredential,
            _ => ErrorKind::Other,
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::ServerError {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}
