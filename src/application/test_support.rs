//! In-memory model repository for service tests.

use std::collections::HashSet;

use crate::domain::features::ML_FEATURE_COUNT;
use crate::domain::{ClassifierFamily, Horizon, Sex};
use crate::ports::{
    check_dimension, FeatureScaler, ModelError, ModelRepository, RiskClassifier, SurvivalForest,
};

/// Returns a fixed probability per horizon.
pub struct ConstantClassifier {
    pub probability: f64,
}

impl RiskClassifier for ConstantClassifier {
    fn n_features(&self) -> usize {
        ML_FEATURE_COUNT
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_dimension(ML_FEATURE_COUNT, features)?;
        Ok(self.probability)
    }
}

/// Exponential survival with a fixed yearly hazard.
pub struct ExponentialForest {
    pub hazard: f64,
}

impl SurvivalForest for ExponentialForest {
    fn n_features(&self) -> usize {
        ML_FEATURE_COUNT
    }

    fn survival_at(&self, features: &[f64], time: f64) -> Result<f64, ModelError> {
        check_dimension(ML_FEATURE_COUNT, features)?;
        Ok((-self.hazard * time).exp())
    }
}

pub struct IdentityScaler;

impl FeatureScaler for IdentityScaler {
    fn n_features(&self) -> usize {
        ML_FEATURE_COUNT
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_dimension(ML_FEATURE_COUNT, features)?;
        Ok(features.to_vec())
    }
}

/// Serves constant models; families in `missing` report `NotFound`.
#[derive(Default)]
pub struct FakeRepository {
    pub missing: HashSet<ClassifierFamily>,
    pub missing_forest: bool,
    pub missing_scaler: bool,
    /// Probability returned by every classifier (default 0.05)
    pub probability: Option<f64>,
}

impl FakeRepository {
    pub fn without(family: ClassifierFamily) -> Self {
        Self {
            missing: HashSet::from([family]),
            ..Self::default()
        }
    }
}

/// Probability the fake classifiers return for a horizon.
pub fn fake_probability(base: f64, horizon: Horizon) -> f64 {
    base / (horizon.index() as f64 + 1.0)
}

impl ModelRepository for FakeRepository {
    fn load_classifier(
        &self,
        family: ClassifierFamily,
        sex: Sex,
        horizon: Horizon,
    ) -> Result<Box<dyn RiskClassifier>, ModelError> {
        if self.missing.contains(&family) {
            return Err(ModelError::NotFound(format!(
                "{sex}_{}_Model_{}Risk.json",
                family.artifact_code(),
                horizon.artifact_tag()
            )));
        }
        Ok(Box::new(ConstantClassifier {
            probability: fake_probability(self.probability.unwrap_or(0.05), horizon),
        }))
    }

    fn load_survival_forest(&self, sex: Sex) -> Result<Box<dyn SurvivalForest>, ModelError> {
        if self.missing_forest {
            return Err(ModelError::NotFound(format!("{sex}_RSF_Model.json")));
        }
        Ok(Box::new(ExponentialForest { hazard: 0.01 }))
    }

    fn load_scaler(&self) -> Result<Box<dyn FeatureScaler>, ModelError> {
        if self.missing_scaler {
            return Err(ModelError::NotFound("data_scaler.json".to_string()));
        }
        Ok(Box::new(IdentityScaler))
    }
}
