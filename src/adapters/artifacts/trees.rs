//! Tree ensembles: gradient-boosted classifiers and random survival forests.
//!
//! Trees are stored as flat node arrays with the root at index 0. A split
//! sends a sample left when `x[feature] <= threshold`.

use serde::{Deserialize, Serialize};

use super::check_feature_names;
use super::linear::sigmoid;
use crate::ports::{check_dimension, ModelError, RiskClassifier, SurvivalForest};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode<L> {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: L,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree<L> {
    pub nodes: Vec<TreeNode<L>>,
}

impl<L> DecisionTree<L> {
    /// Structure checks: children point forward, features are in range.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the offending node.
    pub fn validate(&self, n_features: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::Invalid("tree has no nodes".into()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(ModelError::Invalid(format!(
                        "node {index} splits on feature {feature} of {n_features}"
                    )));
                }
                if threshold.is_nan() {
                    return Err(ModelError::Invalid(format!("node {index} has a NaN threshold")));
                }
                for child in [*left, *right] {
                    if child <= index || child >= self.nodes.len() {
                        return Err(ModelError::Invalid(format!(
                            "node {index} has invalid child {child}"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf for `x`.
    ///
    /// # Errors
    /// Returns `ModelError::Query` if the walk leaves the node array.
    pub fn leaf(&self, x: &[f64]) -> Result<&L, ModelError> {
        let mut index = 0;
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(value),
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x.get(*feature).ok_or_else(|| {
                        ModelError::Query(format!("feature {feature} out of range"))
                    })?;
                    index = if *v <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(ModelError::Query(format!("node {index} does not exist")));
                }
            }
        }
        Err(ModelError::Query("tree walk did not reach a leaf".into()))
    }
}

/// Binary gradient-boosted trees:
/// `p = σ(init_score + learning_rate · Σ tree(x))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub n_features: usize,
    pub init_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<DecisionTree<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl GradientBoostedTrees {
    /// # Errors
    /// Returns `ModelError::Invalid` on an empty or malformed ensemble.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("ensemble has no trees".into()));
        }
        if !self.init_score.is_finite() || !self.learning_rate.is_finite() {
            return Err(ModelError::Invalid(
                "init_score and learning_rate must be finite".into(),
            ));
        }
        for tree in &self.trees {
            tree.validate(self.n_features)?;
        }
        check_feature_names(self.feature_names.as_deref(), self.n_features)
    }
}

impl RiskClassifier for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_dimension(self.n_features, features)?;
        let mut raw = 0.0;
        for tree in &self.trees {
            raw += *tree.leaf(features)?;
        }
        Ok(sigmoid(self.init_score + self.learning_rate * raw))
    }
}

/// Random survival forest exported with per-leaf cumulative hazard.
///
/// The ensemble cumulative hazard is the mean over trees, and survival is
/// `exp(-CHF(t))`. Survival can only be read at a death time of the forest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomSurvivalForest {
    pub n_features: usize,
    pub unique_death_times: Vec<f64>,
    pub trees: Vec<DecisionTree<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl RandomSurvivalForest {
    /// # Errors
    /// Returns `ModelError::Invalid` on an empty or malformed forest.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }
        if self.unique_death_times.is_empty()
            || self
                .unique_death_times
                .windows(2)
                .any(|w| !(w[0] < w[1]))
        {
            return Err(ModelError::Invalid(
                "unique_death_times must be non-empty and strictly increasing".into(),
            ));
        }

        let n_times = self.unique_death_times.len();
        for tree in &self.trees {
            tree.validate(self.n_features)?;
            for node in &tree.nodes {
                if let TreeNode::Leaf { value } = node {
                    if value.len() != n_times {
                        return Err(ModelError::Invalid(format!(
                            "leaf hazard has {} values for {n_times} death times",
                            value.len()
                        )));
                    }
                }
            }
        }
        check_feature_names(self.feature_names.as_deref(), self.n_features)
    }

    /// Ensemble cumulative hazard at death-time index `index`.
    fn cumulative_hazard(&self, features: &[f64], index: usize) -> Result<f64, ModelError> {
        let mut total = 0.0;
        for tree in &self.trees {
            let chf = tree.leaf(features)?;
            total += chf
                .get(index)
                .ok_or_else(|| ModelError::Query("leaf hazard too short".into()))?;
        }
        Ok(total / self.trees.len() as f64)
    }
}

impl SurvivalForest for RandomSurvivalForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn survival_at(&self, features: &[f64], time: f64) -> Result<f64, ModelError> {
        check_dimension(self.n_features, features)?;
        let index = self
            .unique_death_times
            .iter()
            .position(|t| *t == time)
            .ok_or_else(|| {
                ModelError::Query(format!("{time} is not a death time of the forest"))
            })?;
        Ok((-self.cumulative_hazard(features, index)?).exp())
    }
}
