#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the accident risk server.
//!
//! Prediction and weather payloads come from the model and weather crates;
//! these are the envelope types around them.

use serde::{Deserialize, Serialize};

/// Prediction output format used when the request does not name one.
pub const DEFAULT_PREDICTION_FORMAT: &str = "list";

/// Weather output format used when the request does not name one.
pub const DEFAULT_WEATHER_FORMAT: &str = "pd";

/// Query parameters for endpoints that only take an output format.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatParams {
    /// Output format name.
    pub format: Option<String>,
}

impl FormatParams {
    #[must_use]
    pub fn prediction_format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_PREDICTION_FORMAT)
    }
}

/// Query parameters for coordinate endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinateParams {
    pub lat: f64,
    pub lon: f64,
    /// Output format name.
    pub format: Option<String>,
}

impl CoordinateParams {
    #[must_use]
    pub fn prediction_format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_PREDICTION_FORMAT)
    }

    #[must_use]
    pub fn weather_format(&self) -> &str {
        self.format.as_deref().unwrap_or(DEFAULT_WEATHER_FORMAT)
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Trees in the loaded model.
    pub model_trees: usize,
    /// Known locations available for matching.
    pub locations: usize,
}

/// The weather station nearest to a query coordinate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiStation {
    pub id: String,
    pub icao: String,
    pub wmo: Option<String>,
    pub name: String,
    pub region: String,
    pub timezone: String,
    pub latitude: f64,
    pub longitude: f64,
    pub elevation_m: f64,
    /// Great-circle distance from the query point.
    pub distance_miles: f64,
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    InvalidFormat,
    InvalidData,
    NotFound,
    Upstream,
    Timeout,
    Internal,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub kind: ApiErrorKind,
}
