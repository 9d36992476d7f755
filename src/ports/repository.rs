//! Model repository port: Trait for locating and loading external models.
//!
//! This trait abstracts where the pretrained artifacts live (a directory of
//! JSON exports by default) from the comparison use case.

use super::risk_model::{FeatureScaler, ModelError, RiskClassifier, SurvivalForest};
use crate::domain::{ClassifierFamily, Horizon, Sex};

/// Source of pretrained external models.
///
/// Each method loads one artifact. Failures are per artifact: a repository
/// that cannot provide one model must still serve the others.
pub trait ModelRepository: Send + Sync {
    /// Load the classifier for one family, sex and horizon.
    ///
    /// # Errors
    /// Returns `ModelError::NotFound` if no artifact exists and
    /// `ModelError::Invalid` if it cannot be decoded.
    fn load_classifier(
        &self,
        family: ClassifierFamily,
        sex: Sex,
        horizon: Horizon,
    ) -> Result<Box<dyn RiskClassifier>, ModelError>;

    /// Load the random survival forest for one sex.
    ///
    /// # Errors
    /// Returns `ModelError::NotFound` or `ModelError::Invalid`.
    fn load_survival_forest(&self, sex: Sex) -> Result<Box<dyn SurvivalForest>, ModelError>;

    /// Load the shared feature scaler.
    ///
    /// # Errors
    /// Returns `ModelError::NotFound` or `ModelError::Invalid`.
    fn load_scaler(&self) -> Result<Box<dyn FeatureScaler>, ModelError>;
}
