//! Multilayer perceptron evaluated from exported dense layers.

use serde::{Deserialize, Serialize};

use super::check_feature_names;
use super::linear::sigmoid;
use crate::ports::{check_dimension, ModelError, RiskClassifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Relu,
    Tanh,
    Sigmoid,
    Linear,
}

impl Activation {
    fn apply(self, z: f64) -> f64 {
        match self {
            Self::Relu => z.max(0.0),
            Self::Tanh => z.tanh(),
            Self::Sigmoid => sigmoid(z),
            Self::Linear => z,
        }
    }
}

/// `y = activation(x · kernel + bias)` with `kernel[n_in][n_out]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseLayer {
    pub kernel: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    pub activation: Activation,
}

impl DenseLayer {
    fn n_in(&self) -> usize {
        self.kernel.len()
    }

    fn n_out(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, x: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (xi, row) in x.iter().zip(&self.kernel) {
            for (o, w) in out.iter_mut().zip(row) {
                *o += xi * w;
            }
        }
        out.into_iter().map(|z| self.activation.apply(z)).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mlp {
    pub layers: Vec<DenseLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl Mlp {
    /// Layer shapes must chain and end in a single output.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` describing the first bad layer.
    pub fn validate(&self) -> Result<(), ModelError> {
        let Some(first) = self.layers.first() else {
            return Err(ModelError::Invalid("network has no layers".into()));
        };

        let mut width = first.n_in();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.n_in() != width {
                return Err(ModelError::Invalid(format!(
                    "layer {i} expects {} inputs, previous layer gives {width}",
                    layer.n_in()
                )));
            }
            if layer.kernel.iter().any(|row| row.len() != layer.n_out()) {
                return Err(ModelError::Invalid(format!(
                    "layer {i} kernel rows must have {} columns",
                    layer.n_out()
                )));
            }
            if layer
                .kernel
                .iter()
                .flatten()
                .chain(&layer.bias)
                .any(|v| !v.is_finite())
            {
                return Err(ModelError::Invalid(format!("layer {i} has non-finite weights")));
            }
            width = layer.n_out();
        }

        if width != 1 {
            return Err(ModelError::Invalid(format!(
                "network must end in one output, got {width}"
            )));
        }
        check_feature_names(self.feature_names.as_deref(), first.n_in())
    }
}

impl RiskClassifier for Mlp {
    fn n_features(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::n_in)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<f64, ModelError> {
        check_dimension(self.n_features(), features)?;
        let output = self
            .layers
            .iter()
            .fold(features.to_vec(), |x, layer| layer.forward(&x));
        output
            .first()
            .copied()
            .ok_or_else(|| ModelError::Query("network produced no output".into()))
    }
}
