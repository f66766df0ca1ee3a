#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Accident risk classifier.
//!
//! [`Classifier`] wraps a gradient-boosted tree ensemble over the fixed
//! 20-field feature schema. Prediction is read-only, so a loaded classifier
//! can be shared behind an `Arc` by any number of request handlers.
//! [`PredictionSession`] layers a locked "last prediction" on top for
//! callers that want to predict first and export later.

pub mod booster;
pub mod classifier;
pub mod session;

pub use booster::BoosterConfig;
pub use classifier::Classifier;
pub use session::PredictionSession;

use accident_risk_model_models::FormatError;
use thiserror::Error;

/// Errors from fitting, predicting with, or persisting a classifier.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Reading or writing a model file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A model file is not valid JSON or does not match the model layout.
    #[error("Model file error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing predictions to CSV failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The requested output format is not supported.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// A loaded model was fitted on different features than this build
    /// encodes.
    #[error("Model feature names do not match the encoder: expected {expected:?}, found {found:?}")]
    FeatureMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A model file was written by an incompatible version.
    #[error("Unsupported model format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Hyperparameters are out of range.
    #[error("Invalid booster configuration: {message}")]
    InvalidConfig { message: String },

    /// Two inputs that must align row for row have different lengths.
    #[error("Length mismatch: {features} feature rows but {other} {what}")]
    LengthMismatch {
        features: usize,
        other: usize,
        what: &'static str,
    },

    /// There are no rows to fit on or evaluate.
    #[error("No rows to fit or evaluate")]
    EmptyInput,

    /// A training label is not 0 or 1.
    #[error("Label on row {row} must be 0 or 1, got {label}")]
    InvalidLabel { row: usize, label: u8 },

    /// A training row contains a non-finite value.
    #[error("Feature row {row} contains a non-finite value")]
    NonFiniteFeature { row: usize },

    /// `predict` was called before `fit` or `load_model`.
    #[error("Classifier has not been fitted")]
    NotFitted,

    /// `to_csv` was called on a session that has not predicted anything.
    #[error("No prediction has been made yet")]
    NoPrediction,
}

impl ModelError {
    /// Whether this error was caused by the caller's input rather than the
    /// model or the filesystem.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. }
                | Self::EmptyInput
                | Self::InvalidLabel { .. }
                | Self::NonFiniteFeature { .. }
        )
    }
}
