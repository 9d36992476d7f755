//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundary
//! between the comparison use case and the pretrained model artifacts.

mod repository;
mod risk_model;

pub use repository::ModelRepository;
pub use risk_model::{
    check_dimension, FeatureScaler, ModelError, RiskClassifier, SurvivalForest,
};
