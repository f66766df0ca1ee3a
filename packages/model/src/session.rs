//! A classifier handle that remembers its last prediction.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use accident_risk_features_models::{FeatureVector, IndexKey};
use accident_risk_model_models::{OutputFormat, PredictionOutput, PredictionTable};

use crate::{Classifier, ModelError};

/// Shares a fitted [`Classifier`] and keeps the most recent successful
/// prediction for later export.
///
/// The classifier itself is never mutated; only the stored result is
/// behind the lock, and a failed call leaves it untouched.
#[derive(Debug)]
pub struct PredictionSession {
    classifier: Arc<Classifier>,
    last: RwLock<Option<PredictionTable>>,
}

impl PredictionSession {
    #[must_use]
    pub const fn new(classifier: Arc<Classifier>) -> Self {
        Self {
            classifier,
            last: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Predicts and renders in the named format, storing the result.
    ///
    /// The format is validated before anything is computed.
    ///
    /// # Errors
    ///
    /// * [`ModelError::Format`] if `format` is not a known format name
    /// * any error from [`Classifier::predict`]
    pub fn predict(
        &self,
        features: &[FeatureVector],
        index: &[IndexKey],
        format: &str,
    ) -> Result<PredictionOutput, ModelError> {
        let format = OutputFormat::parse(format)?;
        let table = self.classifier.predict(features, index)?;
        let output = table.render(format);

        *self.last.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
        Ok(output)
    }

    /// The most recent successful prediction, if any.
    #[must_use]
    pub fn last_prediction(&self) -> Option<PredictionTable> {
        self.last
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Writes the most recent prediction to a CSV file.
    ///
    /// # Errors
    ///
    /// * [`ModelError::NoPrediction`] if nothing has been predicted yet
    /// * [`ModelError::Csv`] if writing fails
    pub fn to_csv(&self, path: &Path) -> Result<(), ModelError> {
        let guard = self.last.read().unwrap_or_else(PoisonError::into_inner);
        let table = guard.as_ref().ok_or(ModelError::NoPrediction)?;
        table.to_csv(path)?;
        log::info!("Wrote {} predictions to {}", table.len(), path.display());
        Ok(())
    }
}
