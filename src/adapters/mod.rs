//! Adapters layer: Concrete implementations of ports.
//!
//! - `artifacts`: JSON exports of the external models (LR, SVM, GBT, MLP,
//!   RSF, scaler) read from a model directory with optional SHA-256
//!   manifest verification

pub mod artifacts;

pub use artifacts::JsonArtifactStore;
