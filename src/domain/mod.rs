//! Domain layer: Core types and scoring logic.
//!
//! Pure Rust types with no I/O beyond loading the compiled-in parameter
//! and imputation tables. Data flows one way: raw record, derived
//! features, imputed model columns, per-model feature vector, estimate.

mod derive;
mod estimate;
pub mod features;
mod impute;
mod model;
mod parameters;
mod record;
mod report;
mod survival;

pub use derive::{smoking_now, DerivedFeatures};
pub use estimate::{ComparisonTable, ModelColumn, RiskCell, RiskEstimate};
pub use features::{assemble, ml_vector};
pub use impute::{FeatureRecord, ImputationTable, ImputedRecord};
pub use model::{ClassifierFamily, ClosedFormFamily, Horizon, ModelKind};
pub use parameters::{FamilyParameters, ModelParameters};
pub use record::{FieldValue, RecordInput, Region, RiskFactorRecord, Sex, MISSING};
pub use report::ComparisonReport;
pub use survival::{BaselineSurvival, SexParameters, SurvivalCurve, QUERY_YEARS};
