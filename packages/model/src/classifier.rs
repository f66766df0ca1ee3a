//! The fitted classifier and its JSON model file.

use std::path::Path;

use accident_risk_features::dataset::{QueryTable, TrainingSet};
use accident_risk_features_models::{Feature, FeatureVector, IndexKey};
use accident_risk_model_models::{Prediction, PredictionTable};
use serde::{Deserialize, Serialize};

use crate::{
    ModelError,
    booster::{Booster, BoosterConfig, Tree},
};

/// Version written to new model files.
pub const FORMAT_VERSION: u32 = 1;

/// Probability at or above which a row is labeled 1.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Leading fields of a model file, checked before the trees are parsed.
#[derive(Deserialize)]
struct ModelHeader {
    format_version: u32,
    feature_names: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct ModelFile {
    format_version: u32,
    feature_names: Vec<String>,
    config: BoosterConfig,
    base_score: f64,
    trees: Vec<Tree>,
}

/// Binary accident classifier over [`FeatureVector`]s.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: BoosterConfig,
    booster: Option<Booster>,
}

impl Classifier {
    #[must_use]
    pub const fn new(config: BoosterConfig) -> Self {
        Self {
            config,
            booster: None,
        }
    }

    #[must_use]
    pub const fn config(&self) -> &BoosterConfig {
        &self.config
    }

    #[must_use]
    pub const fn is_fitted(&self) -> bool {
        self.booster.is_some()
    }

    /// Fits the ensemble, replacing any previous fit.
    ///
    /// Nothing is replaced if validation fails.
    ///
    /// # Errors
    ///
    /// * [`ModelError::InvalidConfig`] if the hyperparameters are invalid
    /// * [`ModelError::LengthMismatch`] if `features` and `target` differ in
    ///   length
    /// * [`ModelError::EmptyInput`] if there are no rows
    /// * [`ModelError::InvalidLabel`] if a label is not 0 or 1
    /// * [`ModelError::NonFiniteFeature`] if a row has a `NaN` or infinite
    ///   value
    pub fn fit(
        &mut self,
        features: &[FeatureVector],
        target: &[u8],
    ) -> Result<&mut Self, ModelError> {
        self.config.validate()?;

        if features.len() != target.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                other: target.len(),
                what: "labels",
            });
        }
        if features.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        if let Some((row, &label)) = target.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(ModelError::InvalidLabel { row, label });
        }
        if let Some(row) = features.iter().position(|f| !f.is_complete()) {
            return Err(ModelError::NonFiniteFeature { row });
        }

        log::info!(
            "Fitting {} trees (depth {}, learning rate {}) on {} rows",
            self.config.n_estimators,
            self.config.max_depth,
            self.config.learning_rate,
            features.len()
        );

        self.booster = Some(Booster::fit(&self.config, features, target));
        Ok(self)
    }

    /// Fits on an encoded [`TrainingSet`].
    ///
    /// # Errors
    ///
    /// See [`Self::fit`].
    pub fn fit_set(&mut self, set: &TrainingSet) -> Result<&mut Self, ModelError> {
        self.fit(set.features(), set.target())
    }

    fn booster(&self) -> Result<&Booster, ModelError> {
        self.booster.as_ref().ok_or(ModelError::NotFitted)
    }

    /// Probability of class 1 for each row.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotFitted`] before [`Self::fit`] or
    /// [`Self::load_model`].
    pub fn predict_proba(&self, features: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        let booster = self.booster()?;
        Ok(features.iter().map(|f| booster.predict_proba(f)).collect())
    }

    /// Predicts a label and probability for each row and joins them onto
    /// `index` by position. Does not modify the classifier.
    ///
    /// # Errors
    ///
    /// * [`ModelError::NotFitted`] if there is no fitted ensemble
    /// * [`ModelError::LengthMismatch`] if `features` and `index` differ in
    ///   length
    pub fn predict(
        &self,
        features: &[FeatureVector],
        index: &[IndexKey],
    ) -> Result<PredictionTable, ModelError> {
        if features.len() != index.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                other: index.len(),
                what: "index rows",
            });
        }

        let probabilities = self.predict_proba(features)?;

        Ok(index
            .iter()
            .zip(probabilities)
            .map(|(key, probability)| Prediction {
                index: key.clone(),
                label: u8::from(probability >= DECISION_THRESHOLD),
                probability,
            })
            .collect::<Vec<_>>()
            .into())
    }

    /// Predicts every row of an encoded [`QueryTable`].
    ///
    /// # Errors
    ///
    /// See [`Self::predict`].
    pub fn predict_query(&self, query: &QueryTable) -> Result<PredictionTable, ModelError> {
        self.predict(query.features(), query.index())
    }

    /// Fraction of rows in `set` whose predicted label matches.
    ///
    /// # Errors
    ///
    /// * [`ModelError::NotFitted`] if there is no fitted ensemble
    /// * [`ModelError::EmptyInput`] if `set` is empty
    pub fn evaluate(&self, set: &TrainingSet) -> Result<f64, ModelError> {
        if set.is_empty() {
            return Err(ModelError::EmptyInput);
        }
        let probabilities = self.predict_proba(set.features())?;
        let correct = probabilities
            .iter()
            .zip(set.target())
            .filter(|(p, label)| u8::from(**p >= DECISION_THRESHOLD) == **label)
            .count();

        #[allow(clippy::cast_precision_loss)]
        Ok(correct as f64 / set.len() as f64)
    }

    /// Ordered names of the features the model consumes.
    ///
    /// Loading rejects any model whose stored names differ, so this is
    /// always the encoder's schema.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn feature_names(&self) -> Vec<String> {
        Feature::names()
    }

    /// Normalized total split gain per feature, in schema order. Empty
    /// before fitting.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<(Feature, f64)> {
        self.booster
            .as_ref()
            .map(|b| Feature::all().iter().copied().zip(b.importances()).collect())
            .unwrap_or_default()
    }

    /// Number of trees in the fitted ensemble.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.booster.as_ref().map_or(0, |b| b.trees.len())
    }

    /// Writes the fitted model as JSON.
    ///
    /// # Errors
    ///
    /// * [`ModelError::NotFitted`] if there is nothing to save
    /// * [`ModelError::Io`] or [`ModelError::Json`] if writing fails
    pub fn save_model(&self, path: &Path) -> Result<(), ModelError> {
        let booster = self.booster()?;
        let file = ModelFile {
            format_version: FORMAT_VERSION,
            feature_names: self.feature_names(),
            config: self.config,
            base_score: booster.base_score,
            trees: booster.trees.clone(),
        };

        std::fs::write(path, serde_json::to_string_pretty(&file)?)?;
        log::info!(
            "Saved model with {} trees to {}",
            booster.trees.len(),
            path.display()
        );
        Ok(())
    }

    /// Loads a model written by [`Self::save_model`].
    ///
    /// # Errors
    ///
    /// * [`ModelError::Io`] if the file cannot be read
    /// * [`ModelError::UnsupportedVersion`] for an unknown format version
    /// * [`ModelError::FeatureMismatch`] if the stored feature names differ
    ///   from the encoder's schema
    /// * [`ModelError::Json`] if the file is otherwise malformed
    pub fn load_model(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        let classifier = Self::from_json(&text)?;
        log::info!(
            "Loaded model with {} trees from {}",
            classifier.n_trees(),
            path.display()
        );
        Ok(classifier)
    }

    /// Parses a model from its JSON text.
    ///
    /// # Errors
    ///
    /// See [`Self::load_model`].
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let header: ModelHeader = serde_json::from_str(text)?;
        if header.format_version != FORMAT_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let expected = Feature::names();
        if header.feature_names != expected {
            return Err(ModelError::FeatureMismatch {
                expected,
                found: header.feature_names,
            });
        }

        let file: ModelFile = serde_json::from_str(text)?;
        Ok(Self {
            config: file.config,
            booster: Some(Booster {
                base_score: file.base_score,
                trees: file.trees,
            }),
        })
    }
}
