//! Second-order gradient-boosted decision trees with logistic loss.
//!
//! Each round fits a regression tree to the gradient `g = p - y` and
//! hessian `h = p (1 - p)` of the log loss at the current margin:
//!
//! - leaf weight: `w = -G / (H + lambda)`
//! - split gain: `0.5 * (GL²/(HL+λ) + GR²/(HR+λ) - G²/(H+λ))`
//!
//! Splits are found by exact greedy search over every distinct value of
//! every feature. Rows are presorted once per feature and the sorted lists
//! are partitioned stably as the tree grows, so no node re-sorts.
//!
//! Training uses every row and every feature in every round, so fitting is
//! deterministic.

use accident_risk_features_models::{FEATURE_COUNT, Feature, FeatureVector};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Smallest loss reduction treated as a real improvement.
const MIN_SPLIT_GAIN: f64 = 1e-10;

/// Floor on per-row hessians so saturated rows still carry weight.
const MIN_HESSIAN: f64 = 1e-16;

/// Probability clamp for the initial log-odds.
const BASE_RATE_CLAMP: f64 = 1e-7;

/// Boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoosterConfig {
    /// Number of boosting rounds (trees).
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// Maximum tree depth; a depth of 0 yields single-leaf trees.
    pub max_depth: usize,
    /// Minimum hessian sum required in each child of a split.
    pub min_child_weight: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Minimum loss reduction required to split.
    pub gamma: f64,
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            gamma: 0.0,
        }
    }
}

impl BoosterConfig {
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if a parameter is out of range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |message: String| Err(ModelError::InvalidConfig { message });

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return invalid(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            ));
        }
        if !(self.reg_lambda.is_finite() && self.reg_lambda >= 0.0) {
            return invalid(format!(
                "reg_lambda must be non-negative, got {}",
                self.reg_lambda
            ));
        }
        if !(self.min_child_weight.is_finite() && self.min_child_weight >= 0.0) {
            return invalid(format!(
                "min_child_weight must be non-negative, got {}",
                self.min_child_weight
            ));
        }
        if !(self.gamma.is_finite() && self.gamma >= 0.0) {
            return invalid(format!("gamma must be non-negative, got {}", self.gamma));
        }
        Ok(())
    }
}

/// A regression tree over [`FeatureVector`]s. Leaf weights already include
/// the learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tree {
    Leaf {
        weight: f64,
    },
    Split {
        feature: Feature,
        /// Rows with `value <= threshold` go left.
        threshold: f64,
        /// Loss reduction this split achieved during fitting.
        gain: f64,
        left: Box<Self>,
        right: Box<Self>,
    },
}

impl Tree {
    #[must_use]
    pub fn predict(&self, row: &FeatureVector) -> f64 {
        let mut node = self;
        loop {
            match node {
                Self::Leaf { weight } => return *weight,
                Self::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row.get(*feature) <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn accumulate_gain(&self, totals: &mut [f64; FEATURE_COUNT]) {
        if let Self::Split {
            feature,
            gain,
            left,
            right,
            ..
        } = self
        {
            totals[feature.index()] += gain;
            left.accumulate_gain(totals);
            right.accumulate_gain(totals);
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf { .. } => 0,
            Self::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A fitted ensemble: the initial margin plus the sum of every tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Booster {
    pub base_score: f64,
    pub trees: Vec<Tree>,
}

#[must_use]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl Booster {
    /// Fits an ensemble. Callers validate the inputs first.
    pub(crate) fn fit(config: &BoosterConfig, rows: &[FeatureVector], target: &[u8]) -> Self {
        let n = rows.len();
        let labels: Vec<f64> = target.iter().map(|&t| f64::from(t)).collect();

        #[allow(clippy::cast_precision_loss)]
        let rate = (labels.iter().sum::<f64>() / n as f64).clamp(BASE_RATE_CLAMP, 1.0 - BASE_RATE_CLAMP);
        let base_score = (rate / (1.0 - rate)).ln();

        let presorted: Vec<Vec<usize>> = Feature::all()
            .iter()
            .map(|feature| {
                let mut order: Vec<usize> = (0..n).collect();
                order.sort_by(|&a, &b| rows[a].get(*feature).total_cmp(&rows[b].get(*feature)));
                order
            })
            .collect();

        let mut margins = vec![base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut trees = Vec::with_capacity(config.n_estimators);

        for round in 0..config.n_estimators {
            for i in 0..n {
                let p = sigmoid(margins[i]);
                grad[i] = p - labels[i];
                hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
            }

            let mut builder = TreeBuilder {
                config,
                rows,
                grad: &grad,
                hess: &hess,
                goes_left: vec![false; n],
            };
            let tree = builder.build(presorted.clone(), 0);

            for (margin, row) in margins.iter_mut().zip(rows) {
                *margin += tree.predict(row);
            }

            log::trace!("Boosting round {round}: tree depth {}", tree.depth());
            trees.push(tree);
        }

        Self { base_score, trees }
    }

    /// Raw log-odds for one row.
    #[must_use]
    pub fn margin(&self, row: &FeatureVector) -> f64 {
        self.base_score + self.trees.iter().map(|t| t.predict(row)).sum::<f64>()
    }

    /// Probability of class 1 for one row.
    #[must_use]
    pub fn predict_proba(&self, row: &FeatureVector) -> f64 {
        sigmoid(self.margin(row))
    }

    /// Total split gain per feature, normalized to sum to 1. All zeros if
    /// no tree ever split.
    #[must_use]
    pub fn importances(&self) -> [f64; FEATURE_COUNT] {
        let mut totals = [0.0; FEATURE_COUNT];
        for tree in &self.trees {
            tree.accumulate_gain(&mut totals);
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for value in &mut totals {
                *value /= sum;
            }
        }
        totals
    }
}

struct BestSplit {
    feature: Feature,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    config: &'a BoosterConfig,
    rows: &'a [FeatureVector],
    grad: &'a [f64],
    hess: &'a [f64],
    /// Scratch mask reused by every partition.
    goes_left: Vec<bool>,
}

impl TreeBuilder<'_> {
    /// `sorted[f]` holds this node's rows ordered by feature `f`.
    fn build(&mut self, sorted: Vec<Vec<usize>>, depth: usize) -> Tree {
        let members = &sorted[0];
        let g_sum: f64 = members.iter().map(|&i| self.grad[i]).sum();
        let h_sum: f64 = members.iter().map(|&i| self.hess[i]).sum();
        let weight = self.config.learning_rate * -g_sum / (h_sum + self.config.reg_lambda);

        if depth >= self.config.max_depth || members.len() < 2 {
            return Tree::Leaf { weight };
        }

        let Some(best) = self.best_split(&sorted, g_sum, h_sum) else {
            return Tree::Leaf { weight };
        };

        for &i in &sorted[best.feature.index()] {
            self.goes_left[i] = self.rows[i].get(best.feature) <= best.threshold;
        }

        let mut left = Vec::with_capacity(FEATURE_COUNT);
        let mut right = Vec::with_capacity(FEATURE_COUNT);
        for order in sorted {
            let (l, r): (Vec<usize>, Vec<usize>) = order.into_iter().partition(|&i| self.goes_left[i]);
            left.push(l);
            right.push(r);
        }

        Tree::Split {
            feature: best.feature,
            threshold: best.threshold,
            gain: best.gain,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn best_split(&self, sorted: &[Vec<usize>], g_sum: f64, h_sum: f64) -> Option<BestSplit> {
        let lambda = self.config.reg_lambda;
        let min_child = self.config.min_child_weight;
        let parent_score = g_sum * g_sum / (h_sum + lambda);
        let mut best: Option<BestSplit> = None;

        for (feature, order) in Feature::all().iter().zip(sorted) {
            let mut g_left = 0.0;
            let mut h_left = 0.0;

            for pair in order.windows(2) {
                let (i, next) = (pair[0], pair[1]);
                g_left += self.grad[i];
                h_left += self.hess[i];

                let value = self.rows[i].get(*feature);
                let next_value = self.rows[next].get(*feature);
                if next_value <= value {
                    continue;
                }

                let g_right = g_sum - g_left;
                let h_right = h_sum - h_left;
                if h_left < min_child || h_right < min_child {
                    continue;
                }

                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                        - parent_score);

                if gain > self.config.gamma
                    && gain > MIN_SPLIT_GAIN
                    && best.as_ref().is_none_or(|b| gain > b.gain)
                {
                    best = Some(BestSplit {
                        feature: *feature,
                        threshold: f64::midpoint(value, next_value),
                        gain,
                    });
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Label is 1 exactly when the row is at a junction.
    fn junction_data() -> (Vec<FeatureVector>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut target = Vec::new();
        for i in 0..40_u32 {
            let mut row = FeatureVector::default();
            let junction = i % 2 == 0;
            row.set(Feature::Junction, if junction { 1.0 } else { 0.0 });
            row.set(Feature::TemperatureF, f64::from(50 + i % 7));
            row.set(Feature::StartHour, f64::from(i % 24));
            rows.push(row);
            target.push(u8::from(junction));
        }
        (rows, target)
    }

    #[test]
    fn default_config_is_valid() {
        assert!(BoosterConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_bad_config() {
        let config = BoosterConfig {
            learning_rate: 0.0,
            ..BoosterConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BoosterConfig {
            reg_lambda: -1.0,
            ..BoosterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn learns_a_single_flag() {
        let (rows, target) = junction_data();
        let booster = Booster::fit(&BoosterConfig::default(), &rows, &target);

        for (row, label) in rows.iter().zip(&target) {
            let p = booster.predict_proba(row);
            if *label == 1 {
                assert!(p > 0.9, "expected high probability, got {p}");
            } else {
                assert!(p < 0.1, "expected low probability, got {p}");
            }
        }

        let importances = booster.importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[Feature::Junction.index()] > 0.99);
    }

    #[test]
    fn splits_between_distinct_values() {
        let (rows, target) = junction_data();
        let config = BoosterConfig {
            n_estimators: 1,
            max_depth: 1,
            ..BoosterConfig::default()
        };
        let booster = Booster::fit(&config, &rows, &target);
        match &booster.trees[0] {
            Tree::Split {
                feature, threshold, ..
            } => {
                assert_eq!(*feature, Feature::Junction);
                assert!((threshold - 0.5).abs() < f64::EPSILON);
            }
            Tree::Leaf { .. } => panic!("expected a split"),
        }
    }

    #[test]
    fn constant_labels_never_split() {
        let (rows, _) = junction_data();
        let target = vec![1; rows.len()];
        let booster = Booster::fit(&BoosterConfig::default(), &rows, &target);
        assert!(booster.trees.iter().all(|t| t.depth() == 0));
        assert!(booster.importances().iter().all(|v| *v == 0.0));
        assert!(booster.predict_proba(&rows[0]) > 0.99);
    }

    #[test]
    fn zero_depth_trees_predict_the_base_rate() {
        let (rows, target) = junction_data();
        let config = BoosterConfig {
            max_depth: 0,
            n_estimators: 50,
            ..BoosterConfig::default()
        };
        let booster = Booster::fit(&config, &rows, &target);
        let p = booster.predict_proba(&rows[0]);
        assert!((p - 0.5).abs() < 1e-6, "got {p}");
    }

    #[test]
    fn fitting_is_deterministic() {
        let (rows, target) = junction_data();
        let a = Booster::fit(&BoosterConfig::default(), &rows, &target);
        let b = Booster::fit(&BoosterConfig::default(), &rows, &target);
        assert_eq!(a, b);
    }

    #[test]
    fn tree_serializes_with_feature_names() {
        let tree = Tree::Split {
            feature: Feature::StartDay6,
            threshold: 0.5,
            gain: 1.25,
            left: Box::new(Tree::Leaf { weight: -0.1 }),
            right: Box::new(Tree::Leaf { weight: 0.2 }),
        };
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "split");
        assert_eq!(json["feature"], "Start_Day_6");
        assert_eq!(json["left"]["type"], "leaf");

        let back: Tree = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
