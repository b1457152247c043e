//! Weather API client errors.

use skycast_core::error::{ReqwestErrorExt, WeatherError};
use skycast_core::{AppError, NetworkError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("No matching location: {0}")]
    LocationNotFound(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.into_network_error())
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Network(e) => AppError::Network(e),
            ApiError::MissingApiKey => AppError::Config(skycast_core::ConfigError::MissingSetting(
                "weather.api_key".to_string(),
            )),
            ApiError::InvalidApiKey => AppError::Weather(WeatherError::InvalidApiKey),
            ApiError::LocationNotFound(q) => AppError::Weather(WeatherError::LocationNotFound(q)),
            ApiError::Status { status, message } => {
                AppError::Weather(WeatherError::ApiError { status, message })
            }
            ApiError::Malformed(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        }
    }
}
