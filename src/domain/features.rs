//! Feature layout shared by every model.
//!
//! Model columns follow the training-time column order of the CKB
//! risk-factor table with the region column removed. Machine-learning
//! artifacts see those columns followed by the ten region indicators.

use super::impute::ImputedRecord;
use crate::{Result, StrokeRiskError};

/// Number of model columns.
pub const MODEL_COLUMN_COUNT: usize = 133;

/// Number of features seen by the machine-learning artifacts.
pub const ML_FEATURE_COUNT: usize = MODEL_COLUMN_COUNT + REGION_COLUMNS.len();

/// Training-time model column order.
pub const MODEL_COLUMNS: [&str; MODEL_COLUMN_COUNT] = [
    "region_is_urban", "age_at_study_date", "sbp_mean", "used_blood_pressure_drugs",
    "has_diabetes", "household_size", "has_health_cover", "years_since_quitting_smoking",
    "has_copd", "hypertension_diag", "rheum_heart_dis_diag", "tb_diag", "cirrhosis_hep_diag",
    "peptic_ulcer_diag", "gall_diag", "asthma_diag", "kidney_dis_diag", "fracture_diag",
    "rheum_arthritis_diag", "neurasthenia_diag", "head_injury_diag", "cancer_diag",
    "blood_transfusions", "children", "siblings", "mother_still_alive", "father_still_alive",
    "mother_stroke", "mother_heart_attack", "mother_diabetes", "mother_cancer",
    "father_stroke", "father_diabetes", "father_heart_attack", "father_cancer",
    "siblings_stroke", "siblings_diabetes", "siblings_heart_attack", "siblings_cancer",
    "children_stroke", "children_heart_attack", "children_diabetes", "children_cancer", "met",
    "met_hours", "standing_height_cm", "sitting_height_cm", "waist_cm",
    "waist_hip_ratio_percent", "weight_kg", "bmi_calc", "fat_percent", "dbp_mean",
    "heart_rate_mean_10s", "over_65", "smoking_category_1", "smoking_category_2",
    "smoking_category_3", "smoking_category_4", "diab_under_65", "diab_over_65", "sbp_noHRX",
    "sbp_HRX", "chd_diag", "emph_bronc_diag", "psych_disorder_diag", "highest_education_0",
    "highest_education_1", "highest_education_2", "highest_education_3", "highest_education_4",
    "highest_education_5", "occupation_0", "occupation_1", "occupation_2", "occupation_3",
    "occupation_4", "occupation_5", "occupation_6", "occupation_7", "occupation_8",
    "occupation_9", "household_income_0", "household_income_1", "household_income_2",
    "household_income_3", "household_income_4", "household_income_5", "alcohol_category_1",
    "alcohol_category_2", "alcohol_category_3", "alcohol_category_4", "alcohol_category_5",
    "alcohol_category_6", "smoking_now_0", "smoking_now_1", "smoking_now_2", "smoking_now_3",
    "self_rated_health_0", "self_rated_health_1", "self_rated_health_2", "self_rated_health_3",
    "comparative_health_0", "comparative_health_1", "comparative_health_2",
    "comparative_health_3", "diet_freq_rice_0", "diet_freq_rice_1", "diet_freq_rice_2",
    "diet_freq_rice_3", "diet_freq_rice_4", "diet_freq_wheat_0", "diet_freq_wheat_1",
    "diet_freq_wheat_2", "diet_freq_wheat_3", "diet_freq_wheat_4", "diet_freq_other_staple_0",
    "diet_freq_other_staple_1", "diet_freq_other_staple_2", "diet_freq_other_staple_3",
    "diet_freq_other_staple_4", "bowel_movement_freq_0", "bowel_movement_freq_1",
    "bowel_movement_freq_2", "bowel_movement_freq_3", "gum_bleed_freq_0", "gum_bleed_freq_1",
    "gum_bleed_freq_2", "gum_bleed_freq_3", "missing_mother_history", "missing_father_history",
    "missing_siblings_history", "missing_children_history",
];

/// Region indicators in one-hot order (alphabetical by region).
pub const REGION_COLUMNS: [&str; 10] = [
    "region_Gansu",
    "region_Haikou",
    "region_Harbin",
    "region_Henan",
    "region_Hunan",
    "region_Liuzhou",
    "region_Qingdao",
    "region_Sichuan",
    "region_Suzhou",
    "region_Zhejiang",
];

/// Raw age in years; only the scaled `age_at_study_date` is a model column.
pub const AGE: &str = "age";

/// Current-smoker indicator used by FSRP. Not a model column.
pub const SMOKING_NOW: &str = "smoking_now";

/// Model columns that are always computed and never entered.
///
/// `sbp_mean` is both entered (mmHg) and derived (mmHg / 10) so it is not
/// listed here.
pub const DERIVED_ONLY_COLUMNS: [&str; 7] = [
    "region_is_urban",
    "age_at_study_date",
    "over_65",
    "diab_under_65",
    "diab_over_65",
    "sbp_noHRX",
    "sbp_HRX",
];

/// Categorical answers encoded as indicator groups.
pub const ONE_HOT_GROUPS: [(&str, &[&str]); 13] = [
    (
        "highest_education",
        &[
            "highest_education_0",
            "highest_education_1",
            "highest_education_2",
            "highest_education_3",
            "highest_education_4",
            "highest_education_5",
        ],
    ),
    (
        "occupation",
        &[
            "occupation_0",
            "occupation_1",
            "occupation_2",
            "occupation_3",
            "occupation_4",
            "occupation_5",
            "occupation_6",
            "occupation_7",
            "occupation_8",
            "occupation_9",
        ],
    ),
    (
        "household_income",
        &[
            "household_income_0",
            "household_income_1",
            "household_income_2",
            "household_income_3",
            "household_income_4",
            "household_income_5",
        ],
    ),
    (
        "alcohol_category",
        &[
            "alcohol_category_1",
            "alcohol_category_2",
            "alcohol_category_3",
            "alcohol_category_4",
            "alcohol_category_5",
            "alcohol_category_6",
        ],
    ),
    (
        "smoking_category",
        &[
            "smoking_category_1",
            "smoking_category_2",
            "smoking_category_3",
            "smoking_category_4",
        ],
    ),
    (
        "smoking_now",
        &["smoking_now_0", "smoking_now_1", "smoking_now_2", "smoking_now_3"],
    ),
    (
        "self_rated_health",
        &[
            "self_rated_health_0",
            "self_rated_health_1",
            "self_rated_health_2",
            "self_rated_health_3",
        ],
    ),
    (
        "comparative_health",
        &[
            "comparative_health_0",
            "comparative_health_1",
            "comparative_health_2",
            "comparative_health_3",
        ],
    ),
    (
        "diet_freq_rice",
        &[
            "diet_freq_rice_0",
            "diet_freq_rice_1",
            "diet_freq_rice_2",
            "diet_freq_rice_3",
            "diet_freq_rice_4",
        ],
    ),
    (
        "diet_freq_wheat",
        &[
            "diet_freq_wheat_0",
            "diet_freq_wheat_1",
            "diet_freq_wheat_2",
            "diet_freq_wheat_3",
            "diet_freq_wheat_4",
        ],
    ),
    (
        "diet_freq_other_staple",
        &[
            "diet_freq_other_staple_0",
            "diet_freq_other_staple_1",
            "diet_freq_other_staple_2",
            "diet_freq_other_staple_3",
            "diet_freq_other_staple_4",
        ],
    ),
    (
        "bowel_movement_freq",
        &[
            "bowel_movement_freq_0",
            "bowel_movement_freq_1",
            "bowel_movement_freq_2",
            "bowel_movement_freq_3",
        ],
    ),
    (
        "gum_bleed_freq",
        &[
            "gum_bleed_freq_0",
            "gum_bleed_freq_1",
            "gum_bleed_freq_2",
            "gum_bleed_freq_3",
        ],
    ),
];

/// Every field a risk-factor record accepts besides `sex` and `region`.
pub fn raw_fields() -> impl Iterator<Item = &'static str> {
    std::iter::once(AGE).chain(
        MODEL_COLUMNS
            .iter()
            .copied()
            .filter(|c| !DERIVED_ONLY_COLUMNS.contains(c)),
    )
}

/// Whether `name` can be resolved on an imputed record.
#[must_use]
pub fn is_known_feature(name: &str) -> bool {
    name == SMOKING_NOW || MODEL_COLUMNS.contains(&name) || REGION_COLUMNS.contains(&name)
}

/// Feature order expected by every machine-learning artifact.
#[must_use]
pub fn ml_feature_names() -> Vec<&'static str> {
    MODEL_COLUMNS
        .iter()
        .chain(REGION_COLUMNS.iter())
        .copied()
        .collect()
}

/// Assemble a vector in exactly the order of `features`.
///
/// # Errors
/// Returns `Configuration` if a name is not a known feature.
pub fn assemble<S: AsRef<str>>(record: &ImputedRecord, features: &[S]) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|name| {
            let name = name.as_ref();
            record.get(name).ok_or_else(|| {
                StrokeRiskError::Configuration(format!("unknown feature '{name}'"))
            })
        })
        .collect()
}

/// The 143-wide vector for the machine-learning artifacts.
///
/// # Errors
/// Propagates [`assemble`] errors.
pub fn ml_vector(record: &ImputedRecord) -> Result<Vec<f64>> {
    assemble(record, &ml_feature_names())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::impute::{FeatureRecord, ImputationTable};
    use crate::domain::{Region, RiskFactorRecord};
    use std::collections::HashSet;

    fn imputed(region: Region) -> ImputedRecord {
        let mut record: RiskFactorRecord =
            serde_json::from_str(include_str!("../../tests/fixtures/haikou_female.json"))
                .expect("Fixture should parse");
        record.region = region;
        let table = ImputationTable::embedded().expect("Embedded table");
        table
            .impute(&FeatureRecord::from_record(&record))
            .expect("Should impute")
    }

    #[test]
    fn test_columns_are_unique() {
        let names = ml_feature_names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(names.len(), ML_FEATURE_COUNT);
        assert_eq!(unique.len(), ML_FEATURE_COUNT);
        assert_eq!(ML_FEATURE_COUNT, 143);
    }

    #[test]
    fn test_raw_field_set() {
        let is_raw_field = |name: &str| raw_fields().any(|f| f == name);
        assert_eq!(raw_fields().count(), 127);
        assert!(is_raw_field("age"));
        assert!(is_raw_field("sbp_mean"));
        assert!(!is_raw_field("sbp_HRX"));
        assert!(!is_raw_field("region_Gansu"));
        for (_, members) in ONE_HOT_GROUPS {
            for member in members {
                assert!(is_raw_field(*member), "{member} should be a raw field");
            }
        }
    }

    #[test]
    fn test_region_columns_follow_region_order() {
        for (region, column) in Region::ALL.iter().zip(REGION_COLUMNS) {
            assert_eq!(region.indicator_column(), column);
        }
    }

    #[test]
    fn test_ml_vector_region_one_hot() {
        for (index, region) in Region::ALL.into_iter().enumerate() {
            let vector = ml_vector(&imputed(region)).expect("Should assemble");
            assert_eq!(vector.len(), ML_FEATURE_COUNT);

            let indicators = &vector[MODEL_COLUMN_COUNT..];
            for (i, value) in indicators.iter().enumerate() {
                let expected = if i == index { 1.0 } else { 0.0 };
                assert_eq!(*value, expected, "{region}: indicator {i}");
            }
            assert_eq!(vector[0], if region.is_urban() { 1.0 } else { 0.0 });
        }

        let vector = ml_vector(&imputed(Region::Harbin)).expect("Should assemble");
        // age_at_study_date = 43 / 10
        assert!((vector[1] - 4.3).abs() < 1e-12);
    }

    #[test]
    fn test_assemble_follows_requested_order() {
        let record = imputed(Region::Gansu);
        let vector = assemble(&record, &["sbp_mean", "smoking_now", "region_Gansu"])
            .expect("Should assemble");
        assert_eq!(vector, vec![12.0, 0.0, 1.0]);
    }

    #[test]
    fn test_assemble_unknown_feature_is_configuration_error() {
        let record = imputed(Region::Gansu);
        let err = assemble(&record, &["age_at_study_date", "not_a_feature"])
            .expect_err("Unknown feature should fail");
        assert!(matches!(err, StrokeRiskError::Configuration(_)));
    }
}
