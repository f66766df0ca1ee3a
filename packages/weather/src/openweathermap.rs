//! OpenWeatherMap provider implementation.

use accident_risk_cache::TtlCache;
use accident_risk_features_models::WeatherReading;
use serde::Deserialize;

use crate::config::OpenWeatherMapConfig;
use crate::retry::{self, RetryPolicy};
use crate::{WeatherError, WeatherProvider};

/// Hectopascals to inches of mercury, as the training data records pressure.
pub const HPA_TO_INHG: f64 = 0.014_503_773_773_020_924;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// OpenWeatherMap current weather and forecast client.
///
/// Each lookup kind has its own cache so a burst of zip code requests can't
/// evict coordinate results.
pub struct OpenWeatherMapClient {
    api_key: String,
    config: OpenWeatherMapConfig,
    policy: RetryPolicy,
    client: reqwest::Client,
    by_coordinates: TtlCache<(u64, u64), WeatherReading>,
    by_zip: TtlCache<String, WeatherReading>,
    forecast: TtlCache<u64, WeatherReading>,
}

impl std::fmt::Debug for OpenWeatherMapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherMapClient")
            .field("base_url", &self.config.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl OpenWeatherMapClient {
    /// Creates a client with the request timeout and cache limits from
    /// `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WeatherError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, config: OpenWeatherMapConfig) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()?;

        let ttl = config.cache_ttl();
        let capacity = config.cache_capacity;

        Ok(Self {
            api_key,
            policy: config.retry_policy(),
            client,
            by_coordinates: TtlCache::new(capacity, ttl),
            by_zip: TtlCache::new(capacity, ttl),
            forecast: TtlCache::new(capacity, ttl),
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &OpenWeatherMapConfig {
        &self.config
    }

    async fn fetch<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        query: &str,
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{path}", self.config.base_url);
        log::debug!("Fetching weather for {query} from {url}");

        retry::send_json(
            || {
                self.client
                    .get(&url)
                    .query(params)
                    .query(&[
                        ("appid", self.api_key.as_str()),
                        ("units", self.config.units.as_str()),
                    ])
            },
            self.policy,
            query,
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
    humidity: f64,
    /// Sea-level pressure in hPa.
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

/// Rain volume in millimetres over the last hour or three hours.
#[derive(Debug, Default, Deserialize)]
struct RainBlock {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hours: Option<f64>,
}

/// One observation, either current weather or a forecast period.
#[derive(Debug, Deserialize)]
struct Observation {
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    rain: Option<RainBlock>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<Observation>,
}

impl From<Observation> for WeatherReading {
    fn from(obs: Observation) -> Self {
        let precipitation_mm = obs
            .rain
            .and_then(|r| r.one_hour.or(r.three_hours))
            .unwrap_or(0.0);

        Self {
            temperature_f: obs.main.temp,
            humidity_pct: obs.main.humidity,
            pressure_in: obs.main.pressure * HPA_TO_INHG,
            wind_speed_mph: obs.wind.speed,
            precipitation_in: precipitation_mm / MM_PER_INCH,
        }
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherMapClient {
    async fn by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<WeatherReading, WeatherError> {
        let key = (latitude.to_bits(), longitude.to_bits());
        if let Some(reading) = self.by_coordinates.get(&key) {
            return Ok(reading);
        }

        let query = format!("({latitude}, {longitude})");
        let obs: Observation = self
            .fetch(
                "weather",
                &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
                &query,
            )
            .await?;

        let reading = WeatherReading::from(obs);
        self.by_coordinates.insert(key, reading);
        Ok(reading)
    }

    async fn by_zip(&self, zip_code: &str) -> Result<WeatherReading, WeatherError> {
        if let Some(reading) = self.by_zip.get(&zip_code.to_string()) {
            return Ok(reading);
        }

        let query = format!("zip code {zip_code}");
        let obs: Observation = self
            .fetch(
                "weather",
                &[(
                    "zip",
                    format!("{zip_code},{}", self.config.country_code),
                )],
                &query,
            )
            .await?;

        let reading = WeatherReading::from(obs);
        self.by_zip.insert(zip_code.to_string(), reading);
        Ok(reading)
    }

    async fn city_forecast(&self) -> Result<WeatherReading, WeatherError> {
        let city_id = self.config.city.id;
        if let Some(reading) = self.forecast.get(&city_id) {
            return Ok(reading);
        }

        let query = format!("{} forecast", self.config.city.name);
        let forecast: ForecastResponse = self
            .fetch(
                "forecast",
                &[("id", city_id.to_string()), ("cnt", "1".to_string())],
                &query,
            )
            .await?;

        let obs = forecast
            .list
            .into_iter()
            .next()
            .ok_or(WeatherError::NotFound { query })?;

        let reading = WeatherReading::from(obs);
        self.forecast.insert(city_id, reading);
        Ok(reading)
    }
}
