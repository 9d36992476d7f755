//! Linear classifiers: logistic regression and a Platt-calibrated linear SVM.

use serde::{Deserialize, Serialize};

use super::check_feature_names;
use crate::ports::{check_dimension, ModelError, RiskClassifier};

/// Logistic function, written to avoid overflow for large |z|.
#[must_use]
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn dot(weights: &[f64], x: &[f64]) -> f64 {
    weights.iter().zip(x).fold(0.0, |acc, (w, v)| acc + w * v)
}

fn check_weights(weights: &[f64], intercept: f64) -> Result<(), ModelError> {
    if weights.is_empty() {
        return Err(ModelError::Invalid("weight vector is empty".into()));
    }
    if !intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
        return Err(ModelError::Invalid("weights must be finite".into()));
    }
    Ok(())
}

/// `p = σ(w·x + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LogisticRegression {
    /// # Errors
    /// Returns `ModelError::Invalid` on empty or non-finite weights or
    /// mismatched feature names.
    pub fn validate(&self) -> Result<(), ModelError> {
        check_weights(&self.weights, self.intercept)?;
        check_feature_names(self.feature_names.as_deref(), self.weights.len())
    }
}

impl RiskClassifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_dimension(self.weights.len(), features)?;
        Ok(sigmoid(dot(&self.weights, features) + self.intercept))
    }
}

/// Linear SVM decision function with Platt scaling:
/// `f = w·x + b`, `p = 1 / (1 + exp(A·f + B))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    pub weights: Vec<f64>,
    pub intercept: f64,
    pub platt_a: f64,
    pub platt_b: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl LinearSvm {
    /// # Errors
    /// Returns `ModelError::Invalid` on empty or non-finite parameters or
    /// mismatched feature names.
    pub fn validate(&self) -> Result<(), ModelError> {
        check_weights(&self.weights, self.intercept)?;
        if !self.platt_a.is_finite() || !self.platt_b.is_finite() {
            return Err(ModelError::Invalid("Platt parameters must be finite".into()));
        }
        check_feature_names(self.feature_names.as_deref(), self.weights.len())
    }

    /// Signed distance to the separating hyperplane (unnormalized).
    #[must_use]
    pub fn decision_function(&self, features: &[f64]) -> f64 {
        dot(&self.weights, features) + self.intercept
    }
}

impl RiskClassifier for LinearSvm {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_dimension(self.weights.len(), features)?;
        let f = self.decision_function(features);
        Ok(sigmoid(-(self.platt_a * f + self.platt_b)))
    }
}
