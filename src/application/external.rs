//! External models: loaded once, scored per request with per-cell isolation.

use std::collections::HashMap;

use crate::domain::features::ML_FEATURE_COUNT;
use crate::domain::{
    ClassifierFamily, Horizon, ModelColumn, ModelKind, RiskCell, RiskEstimate, Sex, QUERY_YEARS,
};
use crate::ports::{FeatureScaler, ModelError, ModelRepository, RiskClassifier, SurvivalForest};
use crate::StrokeRiskError;

type Loaded<T> = Result<Box<T>, ModelError>;

/// Every external artifact for both sexes, or the reason it is unavailable.
pub struct ExternalModels {
    classifiers: HashMap<(ClassifierFamily, Sex, Horizon), Loaded<dyn RiskClassifier>>,
    forests: HashMap<Sex, Loaded<dyn SurvivalForest>>,
    scaler: Loaded<dyn FeatureScaler>,
}

fn expect_width(n_features: usize) -> Result<(), ModelError> {
    if n_features == ML_FEATURE_COUNT {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            expected: ML_FEATURE_COUNT,
            got: n_features,
        })
    }
}

impl ExternalModels {
    /// Load every artifact from `repository`. Failures are kept per artifact.
    pub fn load<R: ModelRepository + ?Sized>(repository: &R) -> Self {
        let mut classifiers = HashMap::new();
        for family in ClassifierFamily::ALL {
            for sex in Sex::ALL {
                for horizon in Horizon::ALL {
                    let loaded = repository
                        .load_classifier(family, sex, horizon)
                        .and_then(|m| expect_width(m.n_features()).map(|()| m));
                    if let Err(e) = &loaded {
                        tracing::warn!("{} {sex} {horizon} unavailable: {e}", family.model_kind());
                    }
                    classifiers.insert((family, sex, horizon), loaded);
                }
            }
        }

        let forests = Sex::ALL
            .iter()
            .map(|&sex| {
                let loaded = repository
                    .load_survival_forest(sex)
                    .and_then(|m| expect_width(m.n_features()).map(|()| m));
                if let Err(e) = &loaded {
                    tracing::warn!("RSF {sex} unavailable: {e}");
                }
                (sex, loaded)
            })
            .collect();

        let scaler = repository
            .load_scaler()
            .and_then(|s| expect_width(s.n_features()).map(|()| s));
        if let Err(e) = &scaler {
            tracing::warn!("Feature scaler unavailable, SVM and MLP cannot be scored: {e}");
        }

        let models = Self {
            classifiers,
            forests,
            scaler,
        };
        let (available, total) = models.availability();
        tracing::info!("Loaded {available} of {total} external model artifacts");
        models
    }

    /// (loaded, expected) artifact counts.
    #[must_use]
    pub fn availability(&self) -> (usize, usize) {
        let available = self.classifiers.values().filter(|m| m.is_ok()).count()
            + self.forests.values().filter(|m| m.is_ok()).count()
            + usize::from(self.scaler.is_ok());
        let total = self.classifiers.len() + self.forests.len() + 1;
        (available, total)
    }

    /// Score one external model on the 143-wide feature vector.
    ///
    /// Never fails as a whole: every unavailable cell is marked in the
    /// returned column and described in the returned diagnostics.
    #[must_use]
    pub fn score(
        &self,
        model: ModelKind,
        sex: Sex,
        features: &[f64],
    ) -> (ModelColumn, Vec<StrokeRiskError>) {
        if model == ModelKind::Rsf {
            return self.score_forest(sex, features);
        }
        match model.classifier() {
            Some(family) => self.score_classifier(family, sex, features),
            None => {
                let err = StrokeRiskError::Configuration(format!("{model} is not an external model"));
                (ModelColumn::unavailable(model, err.to_string()), vec![err])
            }
        }
    }

    fn score_forest(&self, sex: Sex, features: &[f64]) -> (ModelColumn, Vec<StrokeRiskError>) {
        let model = ModelKind::Rsf;
        let result = match self.forests.get(&sex) {
            Some(Ok(forest)) => forest.cumulative_risks(features, QUERY_YEARS),
            Some(Err(e)) => Err(e.clone()),
            None => Err(ModelError::NotFound(format!("{sex} survival forest"))),
        };

        match result {
            Ok([at_3, at_6, at_9]) => (
                ModelColumn::from_estimate(model, &RiskEstimate::from_cumulative(at_3, at_6, at_9)),
                Vec::new(),
            ),
            Err(e) => (
                ModelColumn::unavailable(model, e.to_string()),
                vec![e.unavailable(model, None)],
            ),
        }
    }

    fn score_classifier(
        &self,
        family: ClassifierFamily,
        sex: Sex,
        features: &[f64],
    ) -> (ModelColumn, Vec<StrokeRiskError>) {
        let model = family.model_kind();

        let scaled;
        let input = if family.requires_scaling() {
            let transformed = match &self.scaler {
                Ok(scaler) => scaler.transform(features),
                Err(e) => Err(e.clone()),
            };
            match transformed {
                Ok(v) => {
                    scaled = v;
                    &scaled[..]
                }
                Err(e) => {
                    let reason = format!("feature scaler: {e}");
                    return (
                        ModelColumn::unavailable(model, reason.clone()),
                        vec![ModelError::Query(reason).unavailable(model, None)],
                    );
                }
            }
        } else {
            features
        };

        let mut diagnostics = Vec::new();
        let cells = Horizon::ALL.map(|horizon| {
            let result = match self.classifiers.get(&(family, sex, horizon)) {
                Some(Ok(classifier)) => classifier.predict_probability(input),
                Some(Err(e)) => Err(e.clone()),
                None => Err(ModelError::NotFound(format!("{model} {sex} {horizon}"))),
            };
            match result {
                Ok(p) => RiskCell::classify(p),
                Err(e) => {
                    let cell = RiskCell::Unavailable(e.to_string());
                    diagnostics.push(e.unavailable(model, Some(horizon)));
                    cell
                }
            }
        });

        (ModelColumn { model, cells }, diagnostics)
    }
}
