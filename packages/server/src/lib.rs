#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for accident risk predictions.
//!
//! Loads the fitted model and a sample of known locations once at startup,
//! then serves predictions for a zip code, for an arbitrary coordinate, or
//! for every known location, each under live weather. The model is shared
//! read-only across workers; every request encodes and predicts on its own.

pub mod error;
mod handlers;
pub mod interactive;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use accident_risk_database::{DbError, db, queries};
use accident_risk_features::dataset::QueryTable;
use accident_risk_features_models::LocationRecord;
use accident_risk_geography::{NearestMatcher, Units};
use accident_risk_model::{Classifier, ModelError};
use accident_risk_weather::{WeatherError, WeatherProvider};
use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use switchy_database::Database;

pub use error::ApiError;

/// Default cap on locations loaded for matching and `/predict/all`.
pub const DEFAULT_MODEL_DATA_LIMIT: u32 = 100_000;

/// Default limit on a single database call.
pub const DEFAULT_DB_TIMEOUT: Duration = Duration::from_secs(10);

/// Startup settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub locations_db: PathBuf,
    /// Query CSV served by `/`.
    pub sample_data: PathBuf,
    /// Locations sampled at startup; `None` loads all of them.
    pub model_data_limit: Option<u32>,
    pub db_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            model_path: PathBuf::from("model.json"),
            locations_db: PathBuf::from(db::DEFAULT_LOCATIONS_DB),
            sample_data: PathBuf::from("sample_test_data.csv"),
            model_data_limit: Some(DEFAULT_MODEL_DATA_LIMIT),
            db_timeout: DEFAULT_DB_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `MODEL_PATH`, `LOCATIONS_DB`,
    /// `SAMPLE_DATA`, `MODEL_DATA_LIMIT` and `DB_TIMEOUT_SECS`, falling back
    /// to defaults.
    ///
    /// A `MODEL_DATA_LIMIT` of `0` loads every location.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| std::env::var(name).ok();

        Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            model_path: var("MODEL_PATH").map_or(defaults.model_path, PathBuf::from),
            locations_db: db::path_from_env(),
            sample_data: var("SAMPLE_DATA").map_or(defaults.sample_data, PathBuf::from),
            model_data_limit: var("MODEL_DATA_LIMIT")
                .and_then(|v| v.parse::<u32>().ok())
                .map_or(defaults.model_data_limit, |n| (n > 0).then_some(n)),
            db_timeout: var("DB_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map_or(defaults.db_timeout, Duration::from_secs),
        }
    }
}

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to load model: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to open locations database: {0}")]
    Database(#[from] DbError),

    #[error("Failed to create weather provider: {0}")]
    Weather(#[from] WeatherError),

    #[error("Loading locations timed out after {0:?}")]
    Timeout(Duration),
}

/// Shared application state.
pub struct AppState {
    /// Fitted model, read-only for the server's lifetime.
    pub classifier: Arc<Classifier>,
    /// Locations database for per-zip lookups.
    pub db: Arc<dyn Database>,
    /// Sampled known locations, used as templates for coordinate queries.
    pub locations: Arc<NearestMatcher<LocationRecord>>,
    pub weather: Arc<dyn WeatherProvider>,
    /// Encoded sample queries served by `/`, if the file was readable.
    pub sample: Option<QueryTable>,
    pub db_timeout: Duration,
}

impl AppState {
    /// Runs a database call under the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Timeout`] if the call does not finish in time,
    /// or the call's own error converted to an [`ApiError`].
    pub async fn with_db_timeout<T, F>(&self, what: &'static str, fut: F) -> Result<T, ApiError>
    where
        F: std::future::Future<Output = Result<T, DbError>>,
    {
        tokio::time::timeout(self.db_timeout, fut)
            .await
            .map_err(|_| ApiError::Timeout { what })?
            .map_err(ApiError::from)
    }
}

/// Loads the model, opens the database, samples locations, encodes the
/// sample queries and creates the weather provider.
///
/// A missing sample file is logged and leaves `/` without data.
///
/// # Errors
///
/// Returns [`StartupError`] if any of those steps fail.
pub async fn load_state(config: &ServerConfig) -> Result<AppState, StartupError> {
    log::info!("Loading model from {}...", config.model_path.display());
    let classifier = Classifier::load_model(&config.model_path)?;
    log::info!("Loaded model with {} trees", classifier.n_trees());

    log::info!("Opening locations database...");
    let db_conn = accident_risk_database::open(&config.locations_db)?;

    let locations = tokio::time::timeout(
        config.db_timeout,
        queries::get_all_model_data(db_conn.as_ref(), config.model_data_limit),
    )
    .await
    .map_err(|_| StartupError::Timeout(config.db_timeout))??;
    log::info!("Loaded {} known locations", locations.len());

    let sample = match QueryTable::from_path(&config.sample_data) {
        Ok(sample) => {
            log::info!("Loaded {} sample queries", sample.len());
            Some(sample)
        }
        Err(e) => {
            log::warn!(
                "Sample data {} unavailable: {e}",
                config.sample_data.display()
            );
            None
        }
    };

    let weather = accident_risk_weather::create_provider_from_env()?;

    Ok(AppState {
        classifier: Arc::new(classifier),
        db: Arc::from(db_conn),
        locations: Arc::new(NearestMatcher::new(locations, Units::Imperial)),
        weather: Arc::from(weather),
        sample,
        db_timeout: config.db_timeout,
    })
}

/// Registers every API route.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health))
        .route(
            "/predict/zip/{zip_code}",
            web::get().to(handlers::predict_zip),
        )
        .route("/predict/coords", web::get().to(handlers::predict_coords))
        .route("/predict/coords/", web::get().to(handlers::predict_coords))
        .route("/predict/all", web::get().to(handlers::predict_all))
        .route("/zip_codes", web::get().to(handlers::zip_codes))
        .route("/weather", web::get().to(handlers::weather))
        .route(
            "/stations/closest",
            web::get().to(handlers::closest_weather_station),
        );
}

/// Starts the accident risk API server with settings from the environment.
///
/// The caller provides the async runtime and initializes logging.
///
/// # Errors
///
/// See [`serve`].
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    serve(ServerConfig::from_env()).await
}

/// Loads state for `config` and serves until shut down.
///
/// # Errors
///
/// Returns an `std::io::Result` error if startup fails, the server fails
/// to bind, or it encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let state = load_state(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = web::Data::new(state);

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.model_data_limit, Some(100_000));
        assert_eq!(config.model_path, PathBuf::from("model.json"));
    }
}
