//! Comparison report for one individual.

use serde::{Deserialize, Serialize};

use super::estimate::ComparisonTable;
use super::record::{Region, Sex};
use crate::StrokeRiskError;

/// Complete comparison record including metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComparisonReport {
    /// Unique identifier
    pub id: String,

    /// Identifier carried over from the input record (if any)
    pub patient_id: Option<String>,

    pub sex: Sex,

    pub region: Region,

    /// Risk table, 4 horizons x 8 models
    pub table: ComparisonTable,

    /// Model columns filled from the imputation table
    pub imputed_fields: Vec<String>,

    /// Timestamp of the comparison
    pub created_at: chrono::DateTime<chrono::Utc>,

    /// Non-fatal problems: unavailable models, numeric anomalies and
    /// per-model configuration errors
    #[serde(skip)]
    pub diagnostics: Vec<StrokeRiskError>,
}

impl ComparisonReport {
    #[must_use]
    pub fn new(sex: Sex, region: Region, table: ComparisonTable) -> Self {
        Self {
            id: uuid_v4(),
            patient_id: None,
            sex,
            region,
            table,
            imputed_fields: Vec::new(),
            created_at: chrono::Utc::now(),
            diagnostics: Vec::new(),
        }
    }

    /// Create a report with a patient reference.
    #[must_use]
    pub fn with_patient(
        sex: Sex,
        region: Region,
        table: ComparisonTable,
        patient_id: impl Into<String>,
    ) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Self::new(sex, region, table)
        }
    }

    /// Diagnostic messages, for JSON output where the errors themselves are
    /// not serialized.
    #[must_use]
    pub fn diagnostic_messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

/// Generate a UUID v4 string from a ChaCha20 CSPRNG seeded by the OS.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
