//! Encoded training and query sets.

use std::path::Path;

use accident_risk_features_models::{FeatureVector, IndexKey};

use crate::{
    EncodeError,
    encoder::{encode_query_table, encode_training_table},
    table::RawTable,
};

/// Labeled feature vectors ready for fitting. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    features: Vec<FeatureVector>,
    target: Vec<u8>,
}

impl TrainingSet {
    /// Pairs feature rows with labels.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Data`] if the lengths differ or a label is not
    /// 0 or 1.
    pub fn new(features: Vec<FeatureVector>, target: Vec<u8>) -> Result<Self, EncodeError> {
        if features.len() != target.len() {
            return Err(EncodeError::Data {
                message: format!(
                    "{} feature rows but {} labels",
                    features.len(),
                    target.len()
                ),
            });
        }
        if let Some(label) = target.iter().find(|&&t| t > 1) {
            return Err(EncodeError::Data {
                message: format!("label must be 0 or 1, got {label}"),
            });
        }
        Ok(Self { features, target })
    }

    /// Loads and encodes a labeled CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the file cannot be read or encoded.
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        let set = encode_training_table(RawTable::from_path(path)?)?;
        log::info!(
            "Built training set of {} rows ({} positive) from {}",
            set.len(),
            set.positives(),
            path.display()
        );
        Ok(set)
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    #[must_use]
    pub fn target(&self) -> &[u8] {
        &self.target
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of rows labeled 1.
    #[must_use]
    pub fn positives(&self) -> usize {
        self.target.iter().filter(|&&t| t == 1).count()
    }

    /// Deterministically splits off a hold-out set.
    ///
    /// Hold-out rows are spread evenly through the set rather than taken
    /// from one end, so time-ordered files still evaluate across their whole
    /// range. Returns `(train, holdout)`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::Data`] if `fraction` is outside `[0, 1)`.
    pub fn split(&self, fraction: f64) -> Result<(Self, Self), EncodeError> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(EncodeError::Data {
                message: format!("hold-out fraction must be in [0, 1), got {fraction}"),
            });
        }

        let mut train = Self::default();
        let mut holdout = Self::default();

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
        let bucket = |i: usize| (i as f64 * fraction).floor() as usize;

        for (i, (vector, label)) in self.features.iter().zip(&self.target).enumerate() {
            let part = if bucket(i + 1) > bucket(i) {
                &mut holdout
            } else {
                &mut train
            };
            part.features.push(*vector);
            part.target.push(*label);
        }

        Ok((train, holdout))
    }
}

/// Encoded query rows with their identifying index, row for row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryTable {
    index: Vec<IndexKey>,
    features: Vec<FeatureVector>,
}

impl QueryTable {
    /// # Errors
    ///
    /// Returns [`EncodeError::Data`] if `index` and `features` differ in
    /// length.
    pub fn new(index: Vec<IndexKey>, features: Vec<FeatureVector>) -> Result<Self, EncodeError> {
        if index.len() != features.len() {
            return Err(EncodeError::Data {
                message: format!(
                    "{} index rows but {} feature rows",
                    index.len(),
                    features.len()
                ),
            });
        }
        Ok(Self { index, features })
    }

    /// Loads and encodes a query CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if the file cannot be read or encoded.
    pub fn from_path(path: &Path) -> Result<Self, EncodeError> {
        encode_query_table(RawTable::from_path(path)?)
    }

    #[must_use]
    pub fn index(&self) -> &[IndexKey] {
        &self.index
    }

    #[must_use]
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sets the zip code on every index row.
    #[must_use]
    pub fn with_zip_code(self, zip_code: &str) -> Self {
        Self {
            index: self
                .index
                .into_iter()
                .map(|key| key.with_zip_code(zip_code))
                .collect(),
            features: self.features,
        }
    }

    /// Splits into the index and feature rows.
    #[must_use]
    pub fn into_parts(self) -> (Vec<IndexKey>, Vec<FeatureVector>) {
        (self.index, self.features)
    }
}
