//! Risk estimates and the eight-model comparison table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::model::{Horizon, ModelKind};
use crate::StrokeRiskError;

/// Four risk numbers for one model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskEstimate {
    /// Cumulative risk over 9 years
    pub nine_year: f64,
    pub zero_to_three: f64,
    pub three_to_six: f64,
    pub six_to_nine: f64,
}

impl RiskEstimate {
    /// Build from cumulative risks at years 3, 6 and 9.
    ///
    /// Intervals are successive differences, so they add back up to the
    /// 9-year figure up to floating-point rounding.
    #[must_use]
    pub fn from_cumulative(at_3: f64, at_6: f64, at_9: f64) -> Self {
        Self {
            nine_year: at_9,
            zero_to_three: at_3,
            three_to_six: at_6 - at_3,
            six_to_nine: at_9 - at_6,
        }
    }

    /// Build from one independently obtained value per horizon, in
    /// [`Horizon::ALL`] order. Intervals need not sum to the 9-year value.
    #[must_use]
    pub fn from_horizons(values: [f64; 4]) -> Self {
        Self {
            nine_year: values[0],
            zero_to_three: values[1],
            three_to_six: values[2],
            six_to_nine: values[3],
        }
    }

    #[must_use]
    pub fn get(&self, horizon: Horizon) -> f64 {
        match horizon {
            Horizon::NineYear => self.nine_year,
            Horizon::ZeroToThree => self.zero_to_three,
            Horizon::ThreeToSix => self.three_to_six,
            Horizon::SixToNine => self.six_to_nine,
        }
    }

    #[must_use]
    pub fn interval_sum(&self) -> f64 {
        self.zero_to_three + self.three_to_six + self.six_to_nine
    }
}

/// One cell of the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum RiskCell {
    /// A probability in [0, 1]
    Probability(f64),
    /// A raw value outside [0, 1] (or NaN), kept unclamped
    Anomalous(f64),
    /// The model could not produce this value
    Unavailable(String),
}

impl RiskCell {
    #[must_use]
    pub fn classify(value: f64) -> Self {
        if (0.0..=1.0).contains(&value) {
            Self::Probability(value)
        } else {
            Self::Anomalous(value)
        }
    }

    /// The raw numeric value, anomalous or not.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Probability(v) | Self::Anomalous(v) => Some(*v),
            Self::Unavailable(_) => None,
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable(_))
    }

    /// Percentage text, `!` suffix for anomalies, `n/a` when unavailable.
    #[must_use]
    pub fn render(&self, decimals: usize) -> String {
        match self {
            Self::Probability(v) => format!("{:.*}%", decimals, v * 100.0),
            Self::Anomalous(v) => format!("{:.*}%!", decimals, v * 100.0),
            Self::Unavailable(_) => "n/a".to_string(),
        }
    }
}

/// The four cells of one model, in [`Horizon::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelColumn {
    pub model: ModelKind,
    pub cells: [RiskCell; 4],
}

impl ModelColumn {
    #[must_use]
    pub fn from_estimate(model: ModelKind, estimate: &RiskEstimate) -> Self {
        Self {
            model,
            cells: Horizon::ALL.map(|h| RiskCell::classify(estimate.get(h))),
        }
    }

    /// All four cells unavailable for the same reason.
    #[must_use]
    pub fn unavailable(model: ModelKind, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            model,
            cells: Horizon::ALL.map(|_| RiskCell::Unavailable(reason.clone())),
        }
    }

    #[must_use]
    pub fn cell(&self, horizon: Horizon) -> &RiskCell {
        &self.cells[horizon.index()]
    }

    /// `NumericAnomaly` for every anomalous cell.
    #[must_use]
    pub fn anomalies(&self) -> Vec<StrokeRiskError> {
        Horizon::ALL
            .iter()
            .filter_map(|h| match self.cell(*h) {
                RiskCell::Anomalous(value) => Some(StrokeRiskError::NumericAnomaly {
                    model: self.model,
                    horizon: *h,
                    value: *value,
                }),
                _ => None,
            })
            .collect()
    }
}

/// 4 horizons x 8 models, columns in [`ModelKind::ALL`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    columns: Vec<ModelColumn>,
}

impl ComparisonTable {
    /// Arrange columns in fixed model order.
    ///
    /// Models without a column are marked unavailable. If a model appears
    /// twice the last column wins.
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = ModelColumn>) -> Self {
        let mut by_model: BTreeMap<ModelKind, ModelColumn> =
            columns.into_iter().map(|c| (c.model, c)).collect();

        let columns = ModelKind::ALL
            .iter()
            .map(|model| {
                by_model
                    .remove(model)
                    .unwrap_or_else(|| ModelColumn::unavailable(*model, "not scored"))
            })
            .collect();

        Self { columns }
    }

    pub fn columns(&self) -> impl Iterator<Item = &ModelColumn> {
        self.columns.iter()
    }

    #[must_use]
    pub fn column(&self, model: ModelKind) -> Option<&ModelColumn> {
        self.columns.iter().find(|c| c.model == model)
    }

    #[must_use]
    pub fn cell(&self, model: ModelKind, horizon: Horizon) -> Option<&RiskCell> {
        self.column(model).map(|c| c.cell(horizon))
    }

    #[must_use]
    pub fn anomalies(&self) -> Vec<StrokeRiskError> {
        self.columns.iter().flat_map(ModelColumn::anomalies).collect()
    }

    /// Fixed-width text table with percentages to `decimals` places.
    #[must_use]
    pub fn render(&self, decimals: usize) -> String {
        let header: Vec<&str> = self.columns.iter().map(|c| c.model.label()).collect();
        let rows: Vec<(&str, Vec<String>)> = Horizon::ALL
            .iter()
            .map(|h| {
                let cells = self.columns.iter().map(|c| c.cell(*h).render(decimals)).collect();
                (h.row_label(), cells)
            })
            .collect();

        let label_width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rows.iter()
                    .map(|(_, cells)| cells[i].len())
                    .fold(name.len(), usize::max)
            })
            .collect();

        let mut out = format!("{:label_width$}", "");
        for (name, width) in header.iter().zip(widths.iter().copied()) {
            out.push_str(&format!("  {name:>width$}"));
        }
        out.push('\n');

        for (label, cells) in &rows {
            out.push_str(&format!("{label:<label_width$}"));
            for (cell, width) in cells.iter().zip(widths.iter().copied()) {
                out.push_str(&format!("  {cell:>width$}"));
            }
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for ComparisonTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cumulative_decomposition() {
        let estimate = RiskEstimate::from_cumulative(0.01, 0.03, 0.06);
        assert_eq!(estimate.zero_to_three, 0.01);
        assert!((estimate.three_to_six - 0.02).abs() < 1e-15);
        assert!((estimate.six_to_nine - 0.03).abs() < 1e-15);
        assert!((estimate.interval_sum() - estimate.nine_year).abs() <= 4.0 * f64::EPSILON);
    }

    #[test]
    fn test_classify_never_clamps() {
        assert_eq!(RiskCell::classify(0.0), RiskCell::Probability(0.0));
        assert_eq!(RiskCell::classify(1.0), RiskCell::Probability(1.0));
        assert_eq!(RiskCell::classify(-0.001), RiskCell::Anomalous(-0.001));
        assert_eq!(RiskCell::classify(1.2), RiskCell::Anomalous(1.2));
        assert!(matches!(RiskCell::classify(f64::NAN), RiskCell::Anomalous(_)));
    }

    #[test]
    fn test_cell_rendering() {
        assert_eq!(RiskCell::Probability(0.0446).render(1), "4.5%");
        assert_eq!(RiskCell::Probability(0.0021).render(2), "0.21%");
        assert_eq!(RiskCell::Anomalous(-0.012).render(1), "-1.2%!");
        assert_eq!(RiskCell::Unavailable("missing".into()).render(1), "n/a");
    }

    #[test]
    fn test_table_fixed_order_and_gaps() {
        let table = ComparisonTable::new(vec![
            ModelColumn::from_estimate(
                ModelKind::Gbt,
                &RiskEstimate::from_horizons([0.05, 0.01, 0.02, 0.02]),
            ),
            ModelColumn::from_estimate(
                ModelKind::Fsrp,
                &RiskEstimate::from_cumulative(0.01, 0.02, 0.03),
            ),
        ]);

        let order: Vec<_> = table.columns().map(|c| c.model).collect();
        assert_eq!(order, ModelKind::ALL.to_vec());

        assert_eq!(
            table.cell(ModelKind::Gbt, Horizon::NineYear),
            Some(&RiskCell::Probability(0.05))
        );
        assert!(!table
            .cell(ModelKind::Mlp, Horizon::SixToNine)
            .map_or(true, RiskCell::is_available));
    }

    #[test]
    fn test_anomalies_reported_per_cell() {
        let table = ComparisonTable::new(vec![ModelColumn::from_estimate(
            ModelKind::CkbCox,
            &RiskEstimate::from_horizons([1.5, 0.2, -0.1, 0.3]),
        )]);
        let anomalies = table.anomalies();
        assert_eq!(anomalies.len(), 2);
        assert!(matches!(
            anomalies[0],
            StrokeRiskError::NumericAnomaly {
                model: ModelKind::CkbCox,
                horizon: Horizon::NineYear,
                ..
            }
        ));
        assert!(matches!(
            anomalies[1],
            StrokeRiskError::NumericAnomaly {
                horizon: Horizon::ThreeToSix,
                ..
            }
        ));
    }

    #[test]
    fn test_render_layout() {
        let table = ComparisonTable::new(vec![ModelColumn::from_estimate(
            ModelKind::Fsrp,
            &RiskEstimate::from_horizons([0.0446, 0.0069, 0.0177, 0.0200]),
        )]);
        let text = table.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("FSRP"));
        assert!(lines[0].trim_end().ends_with("MLP"));
        assert!(lines[1].starts_with("9-year Stroke Risk"));
        assert!(lines[1].contains("4.5%"));
        assert!(lines[4].starts_with("Stroke Risk: 6-9 years"));
        assert!(lines[4].contains("2.0%"));
        assert!(lines[4].trim_end().ends_with("n/a"));

        // Every line has the same width
        let width = lines[0].len();
        assert!(lines.iter().all(|l| l.len() == width));
    }
}
