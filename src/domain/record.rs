//! Raw risk-factor records for stroke risk prediction.
//!
//! Based on the China Kadoorie Biobank (CKB) baseline questionnaire and
//! physical measurements. Every numeric field may be explicitly missing;
//! only `sex` and `region` are required.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::features::{raw_fields, REGION_COLUMNS};
use crate::StrokeRiskError;

/// Marker accepted in place of a number for an unavailable value.
pub const MISSING: &str = "Missing";

/// A single field value: a number, or explicitly unavailable.
///
/// `0.0` is a valid indicator/count and is never treated as absence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Present(f64),
    Missing,
}

impl FieldValue {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Present(v) => Some(v),
            Self::Missing => None,
        }
    }

    #[must_use]
    pub fn is_missing(self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Apply `f` to a present value; missing stays missing.
    #[must_use]
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Present(v) => Self::Present(f(v)),
            Self::Missing => Self::Missing,
        }
    }

    /// Combine two values; missing if either operand is missing.
    #[must_use]
    pub fn zip_with(self, other: Self, f: impl FnOnce(f64, f64) -> f64) -> Self {
        match (self, other) {
            (Self::Present(a), Self::Present(b)) => Self::Present(f(a, b)),
            _ => Self::Missing,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Present(v)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Self::Missing, Self::Present)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Present(v) => serializer.serialize_f64(*v),
            Self::Missing => serializer.serialize_str(MISSING),
        }
    }
}

struct FieldValueVisitor;

impl<'de> Visitor<'de> for FieldValueVisitor {
    type Value = FieldValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a number, \"{MISSING}\" or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<FieldValue, E> {
        Ok(FieldValue::Present(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<FieldValue, E> {
        Ok(FieldValue::Present(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<FieldValue, E> {
        Ok(FieldValue::Present(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<FieldValue, E> {
        if v == MISSING {
            Ok(FieldValue::Missing)
        } else {
            Err(E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Missing)
    }

    fn visit_none<E: de::Error>(self) -> Result<FieldValue, E> {
        Ok(FieldValue::Missing)
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(FieldValueVisitor)
    }
}

/// Biological sex; selects every sex-specific parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }
}

impl FromStr for Sex {
    type Err = StrokeRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            other => Err(StrokeRiskError::Validation(format!(
                "sex must be 'Male' or 'Female', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CKB study region.
///
/// Declaration order is the order of the one-hot region indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    Gansu,
    Haikou,
    Harbin,
    Henan,
    Hunan,
    Liuzhou,
    Qingdao,
    Sichuan,
    Suzhou,
    Zhejiang,
}

impl Region {
    /// All regions in one-hot indicator order.
    pub const ALL: [Region; 10] = [
        Region::Gansu,
        Region::Haikou,
        Region::Harbin,
        Region::Henan,
        Region::Hunan,
        Region::Liuzhou,
        Region::Qingdao,
        Region::Sichuan,
        Region::Suzhou,
        Region::Zhejiang,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Gansu => "Gansu",
            Self::Haikou => "Haikou",
            Self::Harbin => "Harbin",
            Self::Henan => "Henan",
            Self::Hunan => "Hunan",
            Self::Liuzhou => "Liuzhou",
            Self::Qingdao => "Qingdao",
            Self::Sichuan => "Sichuan",
            Self::Suzhou => "Suzhou",
            Self::Zhejiang => "Zhejiang",
        }
    }

    /// Urban study areas: Qingdao, Harbin, Haikou, Suzhou, Liuzhou.
    #[must_use]
    pub fn is_urban(self) -> bool {
        matches!(
            self,
            Self::Qingdao | Self::Harbin | Self::Haikou | Self::Suzhou | Self::Liuzhou
        )
    }

    /// Name of this region's one-hot indicator column (`region_Haikou`).
    #[must_use]
    pub fn indicator_column(self) -> &'static str {
        let index = Self::ALL.iter().position(|r| *r == self).unwrap_or(0);
        REGION_COLUMNS[index]
    }
}

impl FromStr for Region {
    type Err = StrokeRiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|r| r.name() == s)
            .ok_or_else(|| {
                StrokeRiskError::Validation(format!("region '{s}' is not one of the ten CKB regions"))
            })
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wire format of a risk-factor record: a flat JSON object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
}

/// Raw risk-factor data for one individual.
///
/// Holds every documented raw field; fields that were not supplied are
/// [`FieldValue::Missing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RecordInput", into = "RecordInput")]
pub struct RiskFactorRecord {
    /// Record identifier (local only)
    pub id: Option<String>,

    /// Selects sex-specific parameters
    pub sex: Sex,

    /// Selects region-specific baseline survival and indicators
    pub region: Region,

    values: BTreeMap<&'static str, FieldValue>,
}

impl RiskFactorRecord {
    /// Create a record with every raw field missing.
    #[must_use]
    pub fn new(sex: Sex, region: Region) -> Self {
        Self {
            id: None,
            sex,
            region,
            values: raw_fields().map(|f| (f, FieldValue::Missing)).collect(),
        }
    }

    /// Create a record with an identifier.
    #[must_use]
    pub fn with_id(id: impl Into<String>, sex: Sex, region: Region) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(sex, region)
        }
    }

    /// Set a raw field.
    ///
    /// # Errors
    /// Returns `Validation` if `field` is not a documented raw field.
    pub fn set(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<(), StrokeRiskError> {
        match self.values.keys().find(|k| **k == field).copied() {
            Some(key) => {
                self.values.insert(key, value.into());
                Ok(())
            }
            None => Err(StrokeRiskError::Validation(format!("unknown field '{field}'"))),
        }
    }

    /// Builder form of [`RiskFactorRecord::set`].
    ///
    /// # Errors
    /// Returns `Validation` if `field` is not a documented raw field.
    pub fn with(mut self, field: &str, value: impl Into<FieldValue>) -> Result<Self, StrokeRiskError> {
        self.set(field, value)?;
        Ok(self)
    }

    /// Value of a raw field; unknown names read as missing.
    #[must_use]
    pub fn value(&self, field: &str) -> FieldValue {
        self.values.get(field).copied().unwrap_or(FieldValue::Missing)
    }

    /// Iterate over all raw fields.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Names of raw fields that are missing.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.fields()
            .filter(|(_, v)| v.is_missing())
            .map(|(k, _)| k)
            .collect()
    }

    /// Check one-hot groups.
    ///
    /// A group whose members are all present must hold 0/1 indicators with
    /// exactly one set. Groups with a missing member are left to imputation.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (group, members) in super::features::ONE_HOT_GROUPS {
            let values: Option<Vec<f64>> = members.iter().map(|m| self.value(m).value()).collect();
            let Some(values) = values else {
                continue;
            };

            if let Some((member, v)) = members
                .iter()
                .zip(&values)
                .find(|(_, v)| **v != 0.0 && **v != 1.0)
            {
                errors.push(format!("{member} = {v} must be 0 or 1"));
                continue;
            }

            let set = values.iter().filter(|v| **v == 1.0).count();
            if set != 1 {
                errors.push(format!(
                    "one-hot group '{group}' must have exactly one indicator set, found {set}"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl TryFrom<RecordInput> for RiskFactorRecord {
    type Error = StrokeRiskError;

    fn try_from(input: RecordInput) -> Result<Self, Self::Error> {
        let sex: Sex = input
            .sex
            .as_deref()
            .ok_or_else(|| StrokeRiskError::Validation("sex is required".to_string()))?
            .parse()?;
        let region: Region = input
            .region
            .as_deref()
            .ok_or_else(|| StrokeRiskError::Validation("region is required".to_string()))?
            .parse()?;

        let mut record = Self::new(sex, region);
        record.id = input.id;

        let mut unknown = Vec::new();
        for (name, value) in input.fields {
            if record.set(&name, value).is_err() {
                unknown.push(name);
            }
        }
        if !unknown.is_empty() {
            return Err(StrokeRiskError::Validation(format!(
                "unknown fields: {}",
                unknown.join(", ")
            )));
        }

        tracing::debug!(
            "Parsed risk factor record ({} fields missing)",
            record.missing_fields().len()
        );

        Ok(record)
    }
}

impl From<RiskFactorRecord> for RecordInput {
    fn from(record: RiskFactorRecord) -> Self {
        Self {
            id: record.id,
            sex: Some(record.sex.name().to_string()),
            region: Some(record.region.name().to_string()),
            fields: record
                .values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }
}
