//! Pretrained per-feature scaler applied before SVM and MLP.

use serde::{Deserialize, Serialize};

use super::check_feature_names;
use crate::ports::{check_dimension, FeatureScaler, ModelError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerTransform {
    /// `(x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataScaler {
    #[serde(flatten)]
    pub transform: ScalerTransform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl DataScaler {
    /// # Errors
    /// Returns `ModelError::Invalid` on mismatched lengths, non-finite
    /// values or a zero standard-scaler scale.
    pub fn validate(&self) -> Result<(), ModelError> {
        let (offset, scale) = match &self.transform {
            ScalerTransform::Standard { mean, scale } => {
                if scale.iter().any(|s| *s == 0.0) {
                    return Err(ModelError::Invalid("standard scaler has a zero scale".into()));
                }
                (mean, scale)
            }
            ScalerTransform::MinMax { min, scale } => (min, scale),
        };

        if offset.is_empty() || offset.len() != scale.len() {
            return Err(ModelError::Invalid(format!(
                "scaler has {} offsets and {} scales",
                offset.len(),
                scale.len()
            )));
        }
        if offset.iter().chain(scale).any(|v| !v.is_finite()) {
            return Err(ModelError::Invalid("scaler values must be finite".into()));
        }
        check_feature_names(self.feature_names.as_deref(), offset.len())
    }
}

impl FeatureScaler for DataScaler {
    fn n_features(&self) -> usize {
        match &self.transform {
            ScalerTransform::Standard { mean, .. } => mean.len(),
            ScalerTransform::MinMax { min, .. } => min.len(),
        }
    }

    fn transform(&self, features: &[f64]) -> Result<Vec<f64>, ModelError> {
        check_dimension(self.n_features(), features)?;
        let scaled = match &self.transform {
            ScalerTransform::Standard { mean, scale } => features
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            ScalerTransform::MinMax { min, scale } => features
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };
        Ok(scaled)
    }
}
