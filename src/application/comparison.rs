//! Comparison service: scores one record under all eight models.
//!
//! This service coordinates:
//! - Record validation
//! - Feature derivation and imputation
//! - Closed-form scoring
//! - External model scoring
//! - Table assembly and anomaly reporting

use std::sync::Arc;

use crate::domain::{
    ml_vector, ClosedFormFamily, ComparisonReport, ComparisonTable, FeatureRecord,
    ImputationTable, ImputedRecord, ModelColumn, ModelKind, ModelParameters, RiskFactorRecord,
};
use crate::ports::ModelRepository;
use crate::{Result, StrokeRiskError};

use super::external::ExternalModels;

/// Service for comparing stroke risk estimates across models.
///
/// External artifacts are loaded once by [`ComparisonService::initialize`];
/// until then every external column is reported as unavailable.
pub struct ComparisonService<R>
where
    R: ModelRepository,
{
    parameters: ModelParameters,
    imputation: ImputationTable,
    repository: Arc<R>,
    external: Option<ExternalModels>,
}

impl<R> ComparisonService<R>
where
    R: ModelRepository,
{
    /// Create a new comparison service.
    ///
    /// # Errors
    /// Returns `Configuration` if either table fails validation.
    pub fn new(
        parameters: ModelParameters,
        imputation: ImputationTable,
        repository: Arc<R>,
    ) -> Result<Self> {
        parameters.validate()?;
        imputation.validate()?;
        Ok(Self {
            parameters,
            imputation,
            repository,
            external: None,
        })
    }

    /// Load the external model artifacts.
    pub fn initialize(&mut self) {
        tracing::info!("Initializing comparison service...");
        self.external = Some(ExternalModels::load(self.repository.as_ref()));
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.external.is_some()
    }

    /// Validate, derive and impute one record.
    ///
    /// # Errors
    /// Returns `Validation` listing every one-hot violation.
    pub fn prepare(&self, record: &RiskFactorRecord) -> Result<ImputedRecord> {
        record
            .validate()
            .map_err(|errors| StrokeRiskError::Validation(errors.join("; ")))?;

        let features = FeatureRecord::from_record(record);
        tracing::debug!("{} model columns missing before imputation", features.missing_count());
        self.imputation.impute(&features)
    }

    /// Score `record` under every model.
    ///
    /// Only an invalid record fails the whole comparison. Model failures and
    /// out-of-range probabilities are recorded in the report diagnostics.
    ///
    /// # Errors
    /// Returns `Validation` for an invalid record, or the imputation error.
    pub fn compare(&self, record: &RiskFactorRecord) -> Result<ComparisonReport> {
        let imputed = self.prepare(record)?;
        let mut diagnostics = Vec::new();
        let mut columns = Vec::with_capacity(ModelKind::ALL.len());

        for family in ClosedFormFamily::ALL {
            let model = family.model_kind();
            match self.parameters.score(family, &imputed) {
                Ok(estimate) => columns.push(ModelColumn::from_estimate(model, &estimate)),
                Err(e) => {
                    tracing::warn!("{model} could not be scored: {e}");
                    columns.push(ModelColumn::unavailable(model, e.to_string()));
                    diagnostics.push(e);
                }
            }
        }

        let external_models = ModelKind::ALL
            .into_iter()
            .filter(|m| m.closed_form().is_none());
        match (&self.external, ml_vector(&imputed)) {
            (Some(external), Ok(features)) => {
                for model in external_models {
                    let (column, errors) = external.score(model, record.sex, &features);
                    columns.push(column);
                    diagnostics.extend(errors);
                }
            }
            (None, _) => {
                tracing::warn!("External models not loaded; call initialize() first");
                columns.extend(
                    external_models.map(|m| ModelColumn::unavailable(m, "not initialized")),
                );
            }
            (Some(_), Err(e)) => {
                tracing::warn!("Feature vector could not be assembled: {e}");
                columns.extend(external_models.map(|m| ModelColumn::unavailable(m, e.to_string())));
                diagnostics.push(e);
            }
        }

        let table = ComparisonTable::new(columns);
        for anomaly in table.anomalies() {
            tracing::warn!("{anomaly}");
            diagnostics.push(anomaly);
        }

        let mut report = match &record.id {
            Some(id) => ComparisonReport::with_patient(record.sex, record.region, table, id),
            None => ComparisonReport::new(record.sex, record.region, table),
        };
        report.imputed_fields = imputed
            .imputed_fields()
            .iter()
            .map(ToString::to_string)
            .collect();
        report.diagnostics = diagnostics;

        tracing::info!(
            "Comparison {} complete: {} imputed fields, {} diagnostics",
            report.id,
            report.imputed_fields.len(),
            report.diagnostics.len()
        );
        Ok(report)
    }
}
