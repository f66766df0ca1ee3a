//! Embedded weather provider configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::retry::RetryPolicy;

/// OpenWeatherMap settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OpenWeatherMapConfig {
    pub id: String,
    pub name: String,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Unit system requested from the API.
    #[serde(default = "default_units")]
    pub units: String,
    /// Country appended to zip code queries.
    #[serde(default = "default_country_code")]
    pub country_code: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Delay before the first retry; doubled on each later one.
    pub backoff_base_ms: u64,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// City used for forecast lookups.
    pub city: CityConfig,
}

/// A city known to the provider by numeric id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CityConfig {
    pub id: u64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

fn default_units() -> String {
    "imperial".to_string()
}

fn default_country_code() -> String {
    "US".to_string()
}

const fn default_cache_capacity() -> usize {
    accident_risk_cache::DEFAULT_CAPACITY
}

const fn default_cache_ttl_secs() -> u64 {
    accident_risk_cache::DEFAULT_TTL.as_secs()
}

impl OpenWeatherMapConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.backoff_base_ms),
        }
    }
}

const OPENWEATHERMAP_TOML: &str = include_str!("../services/openweathermap.toml");

/// Returns the embedded OpenWeatherMap configuration.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed (this is a compile-time
/// guarantee since the file is embedded).
#[must_use]
pub fn openweathermap() -> OpenWeatherMapConfig {
    toml::de::from_str(OPENWEATHERMAP_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse openweathermap service config: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_config() {
        let config = openweathermap();
        assert_eq!(config.id, "openweathermap");
        assert_eq!(config.api_key_env, "OWM_API_KEY");
        assert_eq!(config.units, "imperial");
        assert!(!config.base_url.ends_with('/'));
    }

    #[test]
    fn forecast_city_is_los_angeles() {
        let city = openweathermap().city;
        assert_eq!(city.id, 5_368_361);
        assert!((city.latitude - 34.052_231).abs() < 1e-9);
        assert!((city.longitude - -118.243_683).abs() < 1e-9);
    }

    #[test]
    fn cache_defaults_to_one_hour() {
        let config = openweathermap();
        assert_eq!(config.cache_capacity, 1000);
        assert_eq!(config.cache_ttl(), Duration::from_secs(3600));
        assert!(config.timeout() > Duration::ZERO);
        assert!(config.retry_policy().max_retries > 0);
    }

    #[test]
    fn optional_fields_have_defaults() {
        let config: OpenWeatherMapConfig = toml::de::from_str(
            r#"
            id = "test"
            name = "Test"
            base_url = "http://localhost"
            api_key_env = "TEST_KEY"
            timeout_secs = 1
            max_retries = 0
            backoff_base_ms = 1

            [city]
            id = 1
            name = "Nowhere"
            latitude = 0.0
            longitude = 0.0
            "#,
        )
        .unwrap();
        assert_eq!(config.country_code, "US");
        assert_eq!(config.cache_capacity, accident_risk_cache::DEFAULT_CAPACITY);
    }
}
