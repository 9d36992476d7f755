//! Feature derivation from raw risk factors.
//!
//! Every derived value is missing if any of its inputs is missing; missing
//! values are filled later by imputation, never here.

use super::features::SMOKING_NOW;
use super::record::{FieldValue, RiskFactorRecord};

/// Age at or above which a person counts as over 65.
pub const OVER_65_AGE: f64 = 65.0;

/// Systolic pressure reference point for the FSRP blood-pressure terms.
pub const SBP_REFERENCE: f64 = 120.0;

/// Values computed from raw record fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedFeatures {
    pub region_is_urban: FieldValue,
    pub age_at_study_date: FieldValue,
    pub over_65: FieldValue,
    pub diab_under_65: FieldValue,
    pub diab_over_65: FieldValue,
    pub sbp_no_hrx: FieldValue,
    pub sbp_hrx: FieldValue,
    pub sbp_mean: FieldValue,
    pub smoking_now: FieldValue,
}

fn indicator(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

/// Current smoker unless the "never/occasional" indicator is set.
#[must_use]
pub fn smoking_now(smoking_now_0: f64) -> f64 {
    indicator(smoking_now_0 != 1.0)
}

impl DerivedFeatures {
    #[must_use]
    pub fn from_record(record: &RiskFactorRecord) -> Self {
        let age = record.value("age");
        let diabetes = record.value("has_diabetes");
        let sbp = record.value("sbp_mean");
        let bp_drugs = record.value("used_blood_pressure_drugs");

        let over_65 = age.map(|a| indicator(a >= OVER_65_AGE));

        Self {
            region_is_urban: FieldValue::Present(indicator(record.region.is_urban())),
            age_at_study_date: age.map(|a| a / 10.0),
            over_65,
            diab_under_65: over_65.zip_with(diabetes, |o, d| indicator(o == 0.0 && d == 1.0)),
            diab_over_65: over_65.zip_with(diabetes, |o, d| indicator(o == 1.0 && d == 1.0)),
            sbp_no_hrx: sbp.zip_with(bp_drugs, |s, d| ((s - SBP_REFERENCE) * (1.0 - d)) / 10.0),
            sbp_hrx: sbp.zip_with(bp_drugs, |s, d| ((s - SBP_REFERENCE) * d) / 10.0),
            sbp_mean: sbp.map(|s| s / 10.0),
            smoking_now: record.value("smoking_now_0").map(smoking_now),
        }
    }

    /// Derived value for a column name, if that column is derived.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<FieldValue> {
        self.cells()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, v)| v)
    }

    /// Column name and value for every derived feature.
    #[must_use]
    pub fn cells(&self) -> [(&'static str, FieldValue); 9] {
        [
            ("region_is_urban", self.region_is_urban),
            ("age_at_study_date", self.age_at_study_date),
            ("over_65", self.over_65),
            ("diab_under_65", self.diab_under_65),
            ("diab_over_65", self.diab_over_65),
            ("sbp_noHRX", self.sbp_no_hrx),
            ("sbp_HRX", self.sbp_hrx),
            ("sbp_mean", self.sbp_mean),
            (SMOKING_NOW, self.smoking_now),
        ]
    }
}
