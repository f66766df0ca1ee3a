#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feature encoding for accident risk prediction.
//!
//! Turns raw accident records into the fixed 20-field
//! [`FeatureVector`](accident_risk_features_models::FeatureVector) the
//! classifier was fitted on. There are two distinct encoding paths:
//!
//! - **Table path** ([`encoder::encode_training_table`],
//!   [`encoder::encode_query_table`]): rows loaded from CSV are cleaned of
//!   nulls, their `Start_Time` is split into month/hour/day, every
//!   categorical column is one-hot encoded, and the 20 model columns are
//!   selected by name.
//! - **Record path** ([`encoder::encode_query_record`]): a single live query
//!   is encoded by direct construction, setting the day-of-week slots from
//!   the known weekday. One-hot encoding a single row cannot produce the six
//!   day columns that row lacks, so the record path never goes through
//!   [`one_hot`].

pub mod dataset;
pub mod encoder;
pub mod one_hot;
pub mod table;
pub mod time;

use thiserror::Error;

/// Name of the timestamp column in accident CSV files.
pub const START_TIME_COLUMN: &str = "Start_Time";

/// Name of the label column in training CSV files.
pub const TARGET_COLUMN: &str = "Target";

/// Errors from loading or encoding records.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Reading the source file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The CSV source was malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A raw column the encoder needs is not present in the source.
    #[error("Missing required column: {column}")]
    MissingColumn {
        /// The absent column.
        column: String,
    },

    /// The one-hot encoded columns do not cover every model feature.
    ///
    /// Indicates a mismatch between the source data and the fitted feature
    /// set (for example a training file with no Sunday records).
    #[error("Encoded data is missing model features: {}", missing.join(", "))]
    MissingFeatures {
        /// Feature columns that the encoding did not produce.
        missing: Vec<String>,
    },

    /// A timestamp could not be parsed.
    #[error("Unparseable {START_TIME_COLUMN} on row {row}: {value:?}")]
    Timestamp {
        /// Zero-based row number after null rows were dropped.
        row: usize,
        /// The raw value.
        value: String,
    },

    /// A record has a missing or invalid value.
    #[error("Invalid record: {message}")]
    Data {
        /// Description of what went wrong.
        message: String,
    },

    /// No usable rows remained after dropping incomplete records.
    #[error("No usable rows after dropping incomplete records")]
    NoRows,
}

impl EncodeError {
    /// Whether this error describes bad input data rather than a schema or
    /// I/O problem.
    #[must_use]
    pub const fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Timestamp { .. } | Self::Data { .. } | Self::NoRows
        )
    }
}
