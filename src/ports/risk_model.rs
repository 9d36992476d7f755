//! Risk model port: Traits for pretrained external models.
//!
//! These traits abstract the exported artifacts of the machine-learning
//! models (survival forest, per-horizon classifiers, feature scaler) from
//! the comparison use case.

use crate::domain::{Horizon, ModelKind};
use crate::StrokeRiskError;

/// Errors that can occur while loading or querying an external model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Invalid artifact: {0}")]
    Invalid(String),

    #[error("Feature dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Query failed: {0}")]
    Query(String),
}

impl ModelError {
    /// Convert into the crate error for one model (and horizon, if any).
    #[must_use]
    pub fn unavailable(self, model: ModelKind, horizon: Option<Horizon>) -> StrokeRiskError {
        let model = match horizon {
            Some(h) => format!("{model} {h}"),
            None => model.to_string(),
        };
        StrokeRiskError::ModelUnavailable {
            model,
            reason: self.to_string(),
        }
    }
}

/// Check a vector length against what a model was trained on.
///
/// # Errors
/// Returns `ModelError::DimensionMismatch` when the lengths differ.
pub fn check_dimension(expected: usize, features: &[f64]) -> Result<(), ModelError> {
    if features.len() == expected {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            expected,
            got: features.len(),
        })
    }
}

/// A binary classifier trained for one horizon.
pub trait RiskClassifier: Send + Sync {
    /// Number of input features.
    fn n_features(&self) -> usize;

    /// Probability of the positive class (stroke within the horizon).
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a wrongly sized vector.
    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError>;
}

/// A survival model producing an individual survival curve.
pub trait SurvivalForest: Send + Sync {
    /// Number of input features.
    fn n_features(&self) -> usize;

    /// Survival probability at `time` (years).
    ///
    /// # Errors
    /// Returns `ModelError::Query` if the model cannot be read at `time`.
    fn survival_at(&self, features: &[f64], time: f64) -> Result<f64, ModelError>;

    /// Cumulative risk `1 - S(t)` at each year in `years`.
    ///
    /// # Errors
    /// Propagates [`SurvivalForest::survival_at`] errors.
    fn cumulative_risks(&self, features: &[f64], years: [u32; 3]) -> Result<[f64; 3], ModelError> {
        let mut risks = [0.0; 3];
        for (slot, year) in risks.iter_mut().zip(years) {
            *slot = 1.0 - self.survival_at(features, f64::from(year))?;
        }
        Ok(risks)
    }
}

/// A fitted per-feature transform applied before SVM and MLP.
pub trait FeatureScaler: Send + Sync {
    /// Number of input features.
    fn n_features(&self) -> usize;

    /// Transform a feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::DimensionMismatch` on a wrongly sized vector.
    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError>;
}
