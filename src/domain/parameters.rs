//! Read-only store of closed-form model parameters.
//!
//! Coefficients, centering means and baseline survival for FSRP, the
//! recalibrated FSRP and the CKB Cox model, per sex. Loaded once and
//! validated as a whole; a store that fails validation is never used.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::estimate::RiskEstimate;
use super::impute::ImputedRecord;
use super::model::ClosedFormFamily;
use super::record::Sex;
use super::survival::SexParameters;
use crate::{Result, StrokeRiskError};

const EMBEDDED_PARAMETERS: &str = include_str!("../../models/parameters.json");

/// Supported parameter file format version.
pub const PARAMETERS_FORMAT_VERSION: u32 = 1;

/// Male and female parameter sets of one model family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyParameters {
    pub male: SexParameters,
    pub female: SexParameters,
}

impl FamilyParameters {
    #[must_use]
    pub fn for_sex(&self, sex: Sex) -> &SexParameters {
        match sex {
            Sex::Male => &self.male,
            Sex::Female => &self.female,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParameters {
    pub version: u32,
    pub fsrp: FamilyParameters,
    pub recalibrated_fsrp: FamilyParameters,
    pub ckb_cox: FamilyParameters,
}

impl ModelParameters {
    /// Parameters compiled into the crate.
    ///
    /// # Errors
    /// Returns an error if the embedded file fails validation.
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(EMBEDDED_PARAMETERS)
    }

    /// Load a replacement parameter file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let params = Self::from_json_str(&content)?;
        tracing::info!("Loaded closed-form model parameters from {:?}", path);
        Ok(params)
    }

    /// Parse and validate.
    ///
    /// # Errors
    /// Returns `Serialization` on malformed JSON, `Configuration` on
    /// inconsistent parameters.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let params: Self = serde_json::from_str(content)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every family and sex.
    ///
    /// # Errors
    /// Returns `Configuration` naming the family and sex at fault.
    pub fn validate(&self) -> Result<()> {
        if self.version != PARAMETERS_FORMAT_VERSION {
            return Err(StrokeRiskError::Configuration(format!(
                "unsupported parameter file version {} (expected {PARAMETERS_FORMAT_VERSION})",
                self.version
            )));
        }

        for family in ClosedFormFamily::ALL {
            for sex in Sex::ALL {
                self.select(family, sex).check().map_err(|e| {
                    StrokeRiskError::Configuration(format!("{} {sex}: {e}", family.model_kind()))
                })?;
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn family(&self, family: ClosedFormFamily) -> &FamilyParameters {
        match family {
            ClosedFormFamily::Fsrp => &self.fsrp,
            ClosedFormFamily::RecalibratedFsrp => &self.recalibrated_fsrp,
            ClosedFormFamily::CkbCox => &self.ckb_cox,
        }
    }

    /// Parameter set for a family and sex.
    #[must_use]
    pub fn select(&self, family: ClosedFormFamily, sex: Sex) -> &SexParameters {
        self.family(family).for_sex(sex)
    }

    /// Score `record` with one closed-form family.
    ///
    /// # Errors
    /// Propagates [`SexParameters::score`] errors.
    pub fn score(&self, family: ClosedFormFamily, record: &ImputedRecord) -> Result<RiskEstimate> {
        self.select(family, record.sex).score(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::impute::{FeatureRecord, ImputationTable};
    use crate::domain::{FieldValue, Region, RiskFactorRecord};

    const EPS: f64 = 1e-12;

    fn imputed(sex: Sex, region: Region, sbp_missing: bool) -> ImputedRecord {
        let mut record: RiskFactorRecord =
            serde_json::from_str(include_str!("../../tests/fixtures/haikou_female.json"))
                .expect("Fixture should parse");
        record.sex = sex;
        record.region = region;
        if sbp_missing {
            record
                .set("sbp_mean", FieldValue::Missing)
                .expect("Known field");
        }
        ImputationTable::embedded()
            .expect("Embedded table")
            .impute(&FeatureRecord::from_record(&record))
            .expect("Should impute")
    }

    fn score(family: ClosedFormFamily, record: &ImputedRecord) -> RiskEstimate {
        ModelParameters::embedded()
            .expect("Embedded parameters")
            .score(family, record)
            .expect("Should score")
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_embedded_parameters_validate() {
        let params = ModelParameters::embedded().expect("Should validate");
        assert_eq!(params.select(ClosedFormFamily::Fsrp, Sex::Male).features.len(), 9);
        assert_eq!(params.select(ClosedFormFamily::CkbCox, Sex::Male).features.len(), 66);
        assert_eq!(params.select(ClosedFormFamily::CkbCox, Sex::Female).features.len(), 70);
        assert_eq!(
            params.select(ClosedFormFamily::Fsrp, Sex::Female).features[2],
            "chd_diag"
        );
    }

    #[test]
    fn test_female_haikou_reference_values() {
        let record = imputed(Sex::Female, Region::Haikou, false);

        let fsrp = score(ClosedFormFamily::Fsrp, &record);
        assert_close(fsrp.nine_year, 0.002119355694873315);
        assert_close(fsrp.zero_to_three, 0.0003522353047586968);
        assert_close(fsrp.three_to_six, 0.0006761695127868173);
        assert_close(fsrp.six_to_nine, 0.001090950877327801);

        let recalibrated = score(ClosedFormFamily::RecalibratedFsrp, &record);
        assert_close(recalibrated.nine_year, 0.04464133557618355);
        assert_close(recalibrated.zero_to_three, 0.006945174287294353);
        assert_close(recalibrated.three_to_six, 0.017708791609594154);
        assert_close(recalibrated.six_to_nine, 0.01998736967929504);

        let cox = score(ClosedFormFamily::CkbCox, &record);
        assert_close(cox.nine_year, 0.04080074340661932);
        assert_close(cox.zero_to_three, 0.006310648141947484);
        assert_close(cox.three_to_six, 0.01615368757785618);
        assert_close(cox.six_to_nine, 0.01833640768681566);
    }

    #[test]
    fn test_region_changes_recalibrated_and_cox_only() {
        let haikou = imputed(Sex::Female, Region::Haikou, false);
        let harbin = imputed(Sex::Female, Region::Harbin, false);

        let recal_haikou = score(ClosedFormFamily::RecalibratedFsrp, &haikou);
        let recal_harbin = score(ClosedFormFamily::RecalibratedFsrp, &harbin);
        assert_close(recal_harbin.nine_year, 0.06619369980060108);
        // Haikou has the higher baseline survival, hence lower risk
        assert!(recal_haikou.nine_year < recal_harbin.nine_year);

        assert_close(
            score(ClosedFormFamily::CkbCox, &harbin).nine_year,
            0.05922187811643265,
        );

        // FSRP has no regional term
        assert_eq!(
            score(ClosedFormFamily::Fsrp, &haikou),
            score(ClosedFormFamily::Fsrp, &harbin)
        );
    }

    #[test]
    fn test_male_parameters() {
        let record = imputed(Sex::Male, Region::Qingdao, false);
        assert_close(
            score(ClosedFormFamily::Fsrp, &record).nine_year,
            0.0046925487148721245,
        );
        assert_close(
            score(ClosedFormFamily::RecalibratedFsrp, &record).nine_year,
            0.013648896680285127,
        );
        assert_close(
            score(ClosedFormFamily::CkbCox, &record).nine_year,
            0.01517609744264059,
        );
    }

    #[test]
    fn test_missing_blood_pressure_uses_female_means() {
        let record = imputed(Sex::Female, Region::Haikou, true);
        assert_close(record.get("sbp_mean").expect("present"), 12.96632725);
        assert_close(record.get("sbp_noHRX").expect("present"), 0.614425494);
        assert_close(record.get("sbp_HRX").expect("present"), 0.351901752);

        assert_close(
            score(ClosedFormFamily::Fsrp, &record).nine_year,
            0.002413456754229548,
        );
        assert_close(
            score(ClosedFormFamily::RecalibratedFsrp, &record).nine_year,
            0.049948270459914346,
        );
        assert_close(
            score(ClosedFormFamily::CkbCox, &record).nine_year,
            0.04321274979444112,
        );
    }

    #[test]
    fn test_interval_decomposition_for_all_families() {
        for sex in Sex::ALL {
            for region in Region::ALL {
                let record = imputed(sex, region, false);
                for family in ClosedFormFamily::ALL {
                    let estimate = score(family, &record);
                    assert!(
                        (estimate.interval_sum() - estimate.nine_year).abs()
                            <= 4.0 * f64::EPSILON,
                        "{family:?} {sex} {region}"
                    );
                    assert!(estimate.three_to_six >= 0.0 && estimate.six_to_nine >= 0.0);
                }
            }
        }
    }

    #[test]
    fn test_age_monotonicity() {
        let params = ModelParameters::embedded().expect("Embedded parameters");
        for family in ClosedFormFamily::ALL {
            let sex_params = params.select(family, Sex::Female);
            let age_index = sex_params
                .features
                .iter()
                .position(|f| f == "age_at_study_date")
                .expect("Every family uses age");
            let coefficient = sex_params.coefficients[age_index];

            let record = imputed(Sex::Female, Region::Haikou, false);
            let mut x = crate::domain::assemble(&record, &sex_params.features).expect("assemble");
            let base = sex_params.estimate(Region::Haikou, &x).expect("score");
            x[age_index] += 0.5;
            let older = sex_params.estimate(Region::Haikou, &x).expect("score");

            if coefficient > 0.0 {
                assert!(older.nine_year > base.nine_year, "{family:?}");
            } else {
                assert!(older.nine_year < base.nine_year, "{family:?}");
            }
        }
    }

    #[test]
    fn test_validation_rejects_mismatched_store() {
        let mut params = ModelParameters::embedded().expect("Embedded parameters");
        params.ckb_cox.male.coefficients.pop();
        let err = params.validate().expect_err("Length mismatch should fail");
        assert!(err.to_string().contains("CKB Cox Male"));

        let mut params = ModelParameters::embedded().expect("Embedded parameters");
        params.fsrp.female.features[0] = "age_years".to_string();
        assert!(params.validate().is_err());

        let mut params = ModelParameters::embedded().expect("Embedded parameters");
        params.version = 3;
        assert!(params.validate().is_err());
    }
}
