//! # strokerisk
//!
//! Multi-horizon stroke risk estimates for a single individual, compared
//! across eight pretrained models.
//!
//! This crate provides:
//! - Feature derivation and sex-specific mean imputation for a manually
//!   entered risk-factor record
//! - Closed-form survival scoring (FSRP, recalibrated FSRP, CKB Cox)
//! - Adapters for exported machine-learning artifacts (RSF, LR, SVM, GBT, MLP)
//! - A comparison table of 9-year and 0-3 / 3-6 / 6-9 year risks
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Records, derived features, imputation, closed-form scoring, results
//! - `ports`: Trait definitions for pretrained external models
//! - `adapters`: JSON artifact store and model evaluators
//! - `application`: The comparison use case orchestrating domain and ports
//! - `config`: Environment-driven runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{
    ComparisonReport, ComparisonTable, FieldValue, Horizon, ModelKind, Region, RiskEstimate,
    RiskFactorRecord, Sex,
};

/// Result type for strokerisk operations
pub type Result<T> = std::result::Result<T, StrokeRiskError>;

/// Main error type for strokerisk
#[derive(Debug, thiserror::Error)]
pub enum StrokeRiskError {
    #[error("Invalid risk factor record: {0}")]
    Validation(String),

    #[error("Configuration mismatch: {0}")]
    Configuration(String),

    #[error("Model unavailable ({model}): {reason}")]
    ModelUnavailable { model: String, reason: String },

    #[error("Numeric anomaly: {model} {horizon} probability {value} is outside [0, 1]")]
    NumericAnomaly {
        model: ModelKind,
        horizon: Horizon,
        value: f64,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
