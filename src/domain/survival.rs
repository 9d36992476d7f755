//! Closed-form survival scoring.
//!
//! One algorithm covers FSRP, the recalibrated FSRP and the CKB Cox model:
//!
//! ```text
//! L = coefficients · x
//! M = coefficients · means
//! risk(y) = 1 - S0(y) ^ exp(L - M)
//! ```
//!
//! where `S0` is the baseline survival for the individual's sex (and, for
//! region-keyed tables, region).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::estimate::RiskEstimate;
use super::features::{assemble, is_known_feature};
use super::impute::ImputedRecord;
use super::record::Region;
use crate::{Result, StrokeRiskError};

/// Year offsets at which cumulative risk is read.
pub const QUERY_YEARS: [u32; 3] = [3, 6, 9];

/// Baseline survival probability by whole year offset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct SurvivalCurve(BTreeMap<u32, f64>);

impl SurvivalCurve {
    pub fn from_points(points: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self(points.into_iter().collect())
    }

    #[must_use]
    pub fn at(&self, year: u32) -> Option<f64> {
        self.0.get(&year).copied()
    }

    /// Query years present, values in (0, 1], non-increasing over time.
    fn check(&self) -> std::result::Result<(), String> {
        for year in QUERY_YEARS {
            if !self.0.contains_key(&year) {
                return Err(format!("baseline survival has no value for year {year}"));
            }
        }

        let mut previous = 1.0;
        for (year, s) in &self.0 {
            if !(*s > 0.0 && *s <= 1.0) {
                return Err(format!("baseline survival at year {year} is {s}, outside (0, 1]"));
            }
            if *s > previous {
                return Err(format!("baseline survival increases at year {year}"));
            }
            previous = *s;
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, f64>> for SurvivalCurve {
    type Error = String;

    fn try_from(points: BTreeMap<String, f64>) -> std::result::Result<Self, Self::Error> {
        points
            .into_iter()
            .map(|(year, s)| {
                year.parse::<u32>()
                    .map(|y| (y, s))
                    .map_err(|_| format!("survival time '{year}' is not a whole number of years"))
            })
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()
            .map(Self)
    }
}

impl From<SurvivalCurve> for BTreeMap<String, f64> {
    fn from(curve: SurvivalCurve) -> Self {
        curve.0.into_iter().map(|(y, s)| (y.to_string(), s)).collect()
    }
}

/// Baseline survival: one population curve or one curve per region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSurvival {
    Population { curve: SurvivalCurve },
    ByRegion { curves: BTreeMap<Region, SurvivalCurve> },
}

impl BaselineSurvival {
    /// The curve that applies to `region`.
    #[must_use]
    pub fn curve(&self, region: Region) -> Option<&SurvivalCurve> {
        match self {
            Self::Population { curve } => Some(curve),
            Self::ByRegion { curves } => curves.get(&region),
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        match self {
            Self::Population { curve } => curve.check(),
            Self::ByRegion { curves } => {
                for region in Region::ALL {
                    let curve = curves
                        .get(&region)
                        .ok_or_else(|| format!("no baseline survival for region {region}"))?;
                    curve.check().map_err(|e| format!("{region}: {e}"))?;
                }
                Ok(())
            }
        }
    }
}

/// Coefficients, centering means and baseline survival for one sex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SexParameters {
    pub features: Vec<String>,
    pub coefficients: Vec<f64>,
    pub means: Vec<f64>,
    pub baseline: BaselineSurvival,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).fold(0.0, |acc, (x, y)| acc + x * y)
}

impl SexParameters {
    /// Structural checks run once at load time.
    ///
    /// # Errors
    /// Returns a description of the first inconsistency.
    pub fn check(&self) -> std::result::Result<(), String> {
        let n = self.features.len();
        if n == 0 {
            return Err("feature list is empty".to_string());
        }
        if self.coefficients.len() != n || self.means.len() != n {
            return Err(format!(
                "lengths differ: {} features, {} coefficients, {} means",
                n,
                self.coefficients.len(),
                self.means.len()
            ));
        }
        if let Some(unknown) = self.features.iter().find(|f| !is_known_feature(f)) {
            return Err(format!("unknown feature '{unknown}'"));
        }
        if self
            .coefficients
            .iter()
            .chain(&self.means)
            .any(|v| !v.is_finite())
        {
            return Err("coefficients and means must be finite".to_string());
        }
        self.baseline.check()
    }

    /// `coefficients · x`
    #[must_use]
    pub fn linear_predictor(&self, x: &[f64]) -> f64 {
        dot(x, &self.coefficients)
    }

    /// `coefficients · means`
    #[must_use]
    pub fn baseline_adjustment(&self) -> f64 {
        dot(&self.means, &self.coefficients)
    }

    /// `exp(L - M)`
    #[must_use]
    pub fn relative_hazard(&self, x: &[f64]) -> f64 {
        (self.linear_predictor(x) - self.baseline_adjustment()).exp()
    }

    /// Four-horizon estimate for an already assembled feature vector.
    ///
    /// Results are not clamped; out-of-range values are left for the caller
    /// to flag.
    ///
    /// # Errors
    /// Returns `Configuration` if `x` has the wrong length or no curve
    /// applies to `region`.
    pub fn estimate(&self, region: Region, x: &[f64]) -> Result<RiskEstimate> {
        if x.len() != self.features.len() {
            return Err(StrokeRiskError::Configuration(format!(
                "feature vector has {} values, parameters expect {}",
                x.len(),
                self.features.len()
            )));
        }

        let curve = self.baseline.curve(region).ok_or_else(|| {
            StrokeRiskError::Configuration(format!("no baseline survival for region {region}"))
        })?;
        let relative_hazard = self.relative_hazard(x);

        let mut cumulative = [0.0; 3];
        for (slot, year) in cumulative.iter_mut().zip(QUERY_YEARS) {
            let s0 = curve.at(year).ok_or_else(|| {
                StrokeRiskError::Configuration(format!("baseline survival has no year {year}"))
            })?;
            *slot = 1.0 - s0.powf(relative_hazard);
        }

        Ok(RiskEstimate::from_cumulative(
            cumulative[0],
            cumulative[1],
            cumulative[2],
        ))
    }

    /// Assemble this model's features from `record` and score them.
    ///
    /// # Errors
    /// Propagates assembly and [`SexParameters::estimate`] errors.
    pub fn score(&self, record: &ImputedRecord) -> Result<RiskEstimate> {
        let x = assemble(record, &self.features)?;
        self.estimate(record.region, &x)
    }
}
