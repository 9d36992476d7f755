//! Sex-specific mean imputation over the model columns.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::derive::{smoking_now, DerivedFeatures};
use super::features::{MODEL_COLUMNS, REGION_COLUMNS, SMOKING_NOW};
use super::record::{FieldValue, Region, RiskFactorRecord, Sex};
use crate::{Result, StrokeRiskError};

const EMBEDDED_IMPUTATION: &str = include_str!("../../models/imputation.json");

/// Supported imputation table format version.
pub const IMPUTATION_FORMAT_VERSION: u32 = 1;

/// Model columns for one individual, derived but not yet imputed.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub sex: Sex,
    pub region: Region,
    cells: BTreeMap<&'static str, FieldValue>,
}

impl FeatureRecord {
    /// Combine raw fields with derived values into the model columns.
    #[must_use]
    pub fn from_record(record: &RiskFactorRecord) -> Self {
        let derived = DerivedFeatures::from_record(record);

        let cells = MODEL_COLUMNS
            .iter()
            .map(|&column| {
                let value = derived.get(column).unwrap_or_else(|| record.value(column));
                (column, value)
            })
            .collect();

        Self {
            sex: record.sex,
            region: record.region,
            cells,
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<FieldValue> {
        self.cells.get(column).copied()
    }

    pub fn cells(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.cells.values().filter(|v| v.is_missing()).count()
    }
}

/// Per-sex mean of every model column in the derivation cohort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputationTable {
    pub version: u32,
    pub male: BTreeMap<String, f64>,
    pub female: BTreeMap<String, f64>,
}

impl ImputationTable {
    /// The table shipped with the crate.
    ///
    /// # Errors
    /// Returns an error if the embedded table fails validation.
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(EMBEDDED_IMPUTATION)
    }

    /// Load a replacement table from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let table = Self::from_json_str(&content)?;
        tracing::info!("Loaded imputation table from {:?}", path);
        Ok(table)
    }

    /// Parse and validate.
    ///
    /// # Errors
    /// Returns `Serialization` on malformed JSON and `Configuration` on an
    /// incomplete table.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    /// Every model column must have a finite mean for both sexes.
    ///
    /// # Errors
    /// Returns `Configuration` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.version != IMPUTATION_FORMAT_VERSION {
            return Err(StrokeRiskError::Configuration(format!(
                "unsupported imputation table version {} (expected {IMPUTATION_FORMAT_VERSION})",
                self.version
            )));
        }

        for sex in Sex::ALL {
            let means = self.means(sex);
            for column in MODEL_COLUMNS {
                match means.get(column) {
                    Some(v) if v.is_finite() => {}
                    Some(v) => {
                        return Err(StrokeRiskError::Configuration(format!(
                            "{sex} imputation value for '{column}' is not finite ({v})"
                        )))
                    }
                    None => {
                        return Err(StrokeRiskError::Configuration(format!(
                            "{sex} imputation table has no value for '{column}'"
                        )))
                    }
                }
            }
        }
        Ok(())
    }

    fn means(&self, sex: Sex) -> &BTreeMap<String, f64> {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }

    /// Imputation value for one column.
    #[must_use]
    pub fn mean(&self, sex: Sex, column: &str) -> Option<f64> {
        self.means(sex).get(column).copied()
    }

    /// Replace every missing model column with the sex-specific mean.
    ///
    /// Present values, including `0.0`, are never touched. `smoking_now`
    /// is recomputed from the imputed `smoking_now_0`.
    ///
    /// # Errors
    /// Returns `Configuration` if a needed mean is absent.
    pub fn impute(&self, record: &FeatureRecord) -> Result<ImputedRecord> {
        let mut values = BTreeMap::new();
        let mut imputed = Vec::new();

        for (column, cell) in record.cells() {
            let value = match cell {
                FieldValue::Present(v) => v,
                FieldValue::Missing => {
                    imputed.push(column);
                    self.mean(record.sex, column).ok_or_else(|| {
                        StrokeRiskError::Configuration(format!(
                            "{} imputation table has no value for '{column}'",
                            record.sex
                        ))
                    })?
                }
            };
            values.insert(column, value);
        }

        let smoking_now_0 = values.get("smoking_now_0").copied().ok_or_else(|| {
            StrokeRiskError::Configuration("smoking_now_0 is not a model column".to_string())
        })?;
        values.insert(SMOKING_NOW, smoking_now(smoking_now_0));

        if !imputed.is_empty() {
            tracing::debug!("Imputed {} missing model columns", imputed.len());
        }

        Ok(ImputedRecord {
            sex: record.sex,
            region: record.region,
            values,
            imputed,
        })
    }
}

/// Fully numeric model columns for one individual.
#[derive(Debug, Clone)]
pub struct ImputedRecord {
    pub sex: Sex,
    pub region: Region,
    values: BTreeMap<&'static str, f64>,
    imputed: Vec<&'static str>,
}

impl ImputedRecord {
    /// Value of a model column, `smoking_now`, or a region indicator.
    #[must_use]
    pub fn get(&self, feature: &str) -> Option<f64> {
        if let Some(v) = self.values.get(feature) {
            return Some(*v);
        }
        if !REGION_COLUMNS.contains(&feature) {
            return None;
        }
        Some(if self.region.indicator_column() == feature {
            1.0
        } else {
            0.0
        })
    }

    /// Model columns that were filled from the imputation table.
    #[must_use]
    pub fn imputed_fields(&self) -> &[&'static str] {
        &self.imputed
    }
}
