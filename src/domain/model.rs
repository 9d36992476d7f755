//! Identifiers for the compared models and the reported time horizons.

use serde::{Deserialize, Serialize};

/// Time window a risk number refers to.
///
/// Declaration order is the row order of the comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Horizon {
    /// Cumulative risk over 9 years
    NineYear,
    /// Risk during years 0-3
    ZeroToThree,
    /// Risk during years 3-6
    ThreeToSix,
    /// Risk during years 6-9
    SixToNine,
}

impl Horizon {
    /// All horizons in table row order.
    pub const ALL: [Horizon; 4] = [
        Horizon::NineYear,
        Horizon::ZeroToThree,
        Horizon::ThreeToSix,
        Horizon::SixToNine,
    ];

    /// Position in [`Horizon::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::NineYear => 0,
            Self::ZeroToThree => 1,
            Self::ThreeToSix => 2,
            Self::SixToNine => 3,
        }
    }

    /// Row label used in the rendered table.
    #[must_use]
    pub fn row_label(self) -> &'static str {
        match self {
            Self::NineYear => "9-year Stroke Risk",
            Self::ZeroToThree => "Stroke Risk: 0-3 years",
            Self::ThreeToSix => "Stroke Risk: 3-6 years",
            Self::SixToNine => "Stroke Risk: 6-9 years",
        }
    }

    /// Tag used in per-horizon artifact file names (`..._Model_0_3YrRisk`).
    #[must_use]
    pub fn artifact_tag(self) -> &'static str {
        match self {
            Self::NineYear => "9Yr",
            Self::ZeroToThree => "0_3Yr",
            Self::ThreeToSix => "3_6Yr",
            Self::SixToNine => "6_9Yr",
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NineYear => write!(f, "9-year"),
            Self::ZeroToThree => write!(f, "0-3 years"),
            Self::ThreeToSix => write!(f, "3-6 years"),
            Self::SixToNine => write!(f, "6-9 years"),
        }
    }
}

/// One of the eight compared models.
///
/// Declaration order is the column order of the comparison table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Framingham Stroke Risk Profile (without atrial fibrillation)
    Fsrp,
    /// FSRP refitted and recalibrated per region on CKB data
    RecalibratedFsrp,
    /// China Kadoorie Biobank Cox model with extended covariates
    CkbCox,
    /// Random survival forest
    Rsf,
    /// Logistic regression, one classifier per horizon
    Lr,
    /// Linear support vector machine, one classifier per horizon
    Svm,
    /// Gradient boosted trees, one classifier per horizon
    Gbt,
    /// Multilayer perceptron, one classifier per horizon
    Mlp,
}

impl ModelKind {
    /// All models in table column order.
    pub const ALL: [ModelKind; 8] = [
        ModelKind::Fsrp,
        ModelKind::RecalibratedFsrp,
        ModelKind::CkbCox,
        ModelKind::Rsf,
        ModelKind::Lr,
        ModelKind::Svm,
        ModelKind::Gbt,
        ModelKind::Mlp,
    ];

    /// Column label used in the rendered table.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Fsrp => "FSRP",
            Self::RecalibratedFsrp => "Recalibrated FSRP",
            Self::CkbCox => "CKB Cox",
            Self::Rsf => "RSF",
            Self::Lr => "LR",
            Self::Svm => "SVM",
            Self::Gbt => "GBT",
            Self::Mlp => "MLP",
        }
    }

    /// The closed-form family backing this model, if any.
    #[must_use]
    pub fn closed_form(self) -> Option<ClosedFormFamily> {
        match self {
            Self::Fsrp => Some(ClosedFormFamily::Fsrp),
            Self::RecalibratedFsrp => Some(ClosedFormFamily::RecalibratedFsrp),
            Self::CkbCox => Some(ClosedFormFamily::CkbCox),
            _ => None,
        }
    }

    /// The per-horizon classifier family backing this model, if any.
    #[must_use]
    pub fn classifier(self) -> Option<ClassifierFamily> {
        match self {
            Self::Lr => Some(ClassifierFamily::Lr),
            Self::Svm => Some(ClassifierFamily::Svm),
            Self::Gbt => Some(ClassifierFamily::Gbt),
            Self::Mlp => Some(ClassifierFamily::Mlp),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Models evaluated from fixed coefficients and baseline survival tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedFormFamily {
    Fsrp,
    RecalibratedFsrp,
    CkbCox,
}

impl ClosedFormFamily {
    pub const ALL: [ClosedFormFamily; 3] = [
        ClosedFormFamily::Fsrp,
        ClosedFormFamily::RecalibratedFsrp,
        ClosedFormFamily::CkbCox,
    ];

    #[must_use]
    pub fn model_kind(self) -> ModelKind {
        match self {
            Self::Fsrp => ModelKind::Fsrp,
            Self::RecalibratedFsrp => ModelKind::RecalibratedFsrp,
            Self::CkbCox => ModelKind::CkbCox,
        }
    }
}

/// Binary classifiers trained separately for each horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierFamily {
    Lr,
    Svm,
    Gbt,
    Mlp,
}

impl ClassifierFamily {
    pub const ALL: [ClassifierFamily; 4] = [
        ClassifierFamily::Lr,
        ClassifierFamily::Svm,
        ClassifierFamily::Gbt,
        ClassifierFamily::Mlp,
    ];

    #[must_use]
    pub fn model_kind(self) -> ModelKind {
        match self {
            Self::Lr => ModelKind::Lr,
            Self::Svm => ModelKind::Svm,
            Self::Gbt => ModelKind::Gbt,
            Self::Mlp => ModelKind::Mlp,
        }
    }

    /// SVM and MLP were trained on scaled inputs.
    #[must_use]
    pub fn requires_scaling(self) -> bool {
        matches!(self, Self::Svm | Self::Mlp)
    }

    /// Code used in artifact file names (`Female_SVM_Model_9YrRisk`).
    #[must_use]
    pub fn artifact_code(self) -> &'static str {
        match self {
            Self::Lr => "LR",
            Self::Svm => "SVM",
            Self::Gbt => "GBT",
            Self::Mlp => "MLP",
        }
    }
}
