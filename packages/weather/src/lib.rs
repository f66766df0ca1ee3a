#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Weather lookups for live accident risk queries.
//!
//! [`WeatherProvider`] is the seam the server depends on; the shipped
//! implementation is [`openweathermap::OpenWeatherMapClient`], configured
//! from an embedded TOML file and authenticated with `OWM_API_KEY`. Every
//! method returns a typed [`WeatherReading`] or an error; a failed lookup
//! is never turned into a zero reading.

pub mod config;
pub mod format;
pub mod openweathermap;
pub mod retry;
pub mod stations;

pub use format::{WeatherFormat, WeatherOutput};

use accident_risk_features_models::WeatherReading;
use thiserror::Error;

/// Errors that can occur while fetching weather.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// HTTP request failed with a non-transient transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected layout.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The requested weather output format is not supported.
    #[error("Unsupported weather format {value:?}; expected one of: pd, dict, tuple")]
    Format {
        /// The rejected format name.
        value: String,
    },

    /// The provider has no data for the requested place.
    #[error("No weather data for {query}")]
    NotFound {
        /// The place that was looked up.
        query: String,
    },

    /// The provider rejected the request.
    #[error("Provider rejected request with HTTP {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// The provider kept failing after every retry.
    #[error("Weather provider unavailable: {message}")]
    Upstream {
        /// Description of the last failure.
        message: String,
    },
}

impl WeatherError {
    /// Whether this error means the provider was unreachable or unhealthy
    /// rather than the request being wrong.
    #[must_use]
    pub fn is_upstream(&self) -> bool {
        match self {
            Self::Upstream { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Source of current and forecast weather.
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Current weather at a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if the lookup fails.
    async fn by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReading, WeatherError>;

    /// Current weather for a US zip code.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::NotFound`] for an unknown zip code, or
    /// another [`WeatherError`] if the lookup fails.
    async fn by_zip(&self, zip_code: &str) -> Result<WeatherReading, WeatherError>;

    /// The next forecast period for the configured city.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError`] if the lookup fails.
    async fn city_forecast(&self) -> Result<WeatherReading, WeatherError>;
}

/// Creates the configured weather provider using the API key from the
/// environment.
///
/// # Errors
///
/// Returns [`WeatherError::Config`] if the API key variable is not set, or
/// [`WeatherError::Http`] if the HTTP client cannot be built.
pub fn create_provider_from_env() -> Result<Box<dyn WeatherProvider>, WeatherError> {
    let config = config::openweathermap();
    let api_key = std::env::var(&config.api_key_env).map_err(|_| WeatherError::Config {
        message: format!("{} environment variable not set", config.api_key_env),
    })?;

    log::info!("Using {} weather provider", config.name);
    Ok(Box::new(openweathermap::OpenWeatherMapClient::new(
        api_key, config,
    )?))
}
