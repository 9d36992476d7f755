//! JSON artifact store for the external models.
//!
//! One directory holds every exported model under its training-time file
//! stem, plus an optional `manifest.json` binding each file to a SHA-256
//! digest:
//!
//! ```text
//! models/
//!   Female_LR_Model_9YrRisk.json  ...  Male_MLP_Model_6_9YrRisk.json
//!   Female_RSF_Model.json
//!   Male_RSF_Model.json
//!   data_scaler.json
//!   manifest.json
//! ```

mod linear;
mod mlp;
mod scaler;
mod trees;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use linear::{sigmoid, LinearSvm, LogisticRegression};
pub use mlp::{Activation, DenseLayer, Mlp};
pub use scaler::{DataScaler, ScalerTransform};
pub use trees::{DecisionTree, GradientBoostedTrees, RandomSurvivalForest, TreeNode};

use crate::domain::features::{ml_feature_names, ML_FEATURE_COUNT};
use crate::domain::{ClassifierFamily, Horizon, Sex};
use crate::ports::{FeatureScaler, ModelError, ModelRepository, RiskClassifier, SurvivalForest};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SCALER_FILE: &str = "data_scaler.json";
pub const MANIFEST_VERSION: u32 = 1;

/// `Female_SVM_Model_0_3YrRisk.json`
#[must_use]
pub fn classifier_file_name(family: ClassifierFamily, sex: Sex, horizon: Horizon) -> String {
    format!(
        "{}_{}_Model_{}Risk.json",
        sex.name(),
        family.artifact_code(),
        horizon.artifact_tag()
    )
}

/// `Male_RSF_Model.json`
#[must_use]
pub fn forest_file_name(sex: Sex) -> String {
    format!("{}_RSF_Model.json", sex.name())
}

/// Optional `feature_names` must match the machine-learning feature order.
pub(crate) fn check_feature_names(
    names: Option<&[String]>,
    n_features: usize,
) -> Result<(), ModelError> {
    let Some(names) = names else {
        return Ok(());
    };
    if names.len() != ML_FEATURE_COUNT || n_features != ML_FEATURE_COUNT {
        return Err(ModelError::Invalid(format!(
            "{} feature names for {n_features} features, expected {ML_FEATURE_COUNT}",
            names.len()
        )));
    }
    if let Some((i, (got, want))) = names
        .iter()
        .zip(ml_feature_names())
        .enumerate()
        .find(|(_, (got, want))| got.as_str() != *want)
    {
        return Err(ModelError::Invalid(format!(
            "feature {i} is '{got}', expected '{want}'"
        )));
    }
    Ok(())
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Digest manifest for a model directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub version: u32,
    /// Unix timestamp (seconds) when this manifest was created.
    pub created_at: i64,
    /// File name to lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

impl ArtifactManifest {
    /// Hash every `.json` file in `dir` except the manifest itself.
    ///
    /// # Errors
    /// Returns an IO error if the directory or a file cannot be read.
    pub fn build(dir: &Path, created_at: i64) -> std::io::Result<Self> {
        let mut files = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || name == MANIFEST_FILE || !name.ends_with(".json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            files.insert(name.to_string(), sha256_hex(&bytes));
        }
        Ok(Self {
            version: MANIFEST_VERSION,
            created_at,
            files,
        })
    }

    fn read(path: &Path) -> Result<Self, ModelError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ModelError::Invalid(format!("{MANIFEST_FILE}: {e}")))?;
        let manifest: Self = serde_json::from_str(&content)
            .map_err(|e| ModelError::Invalid(format!("{MANIFEST_FILE}: {e}")))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ModelError::Invalid(format!(
                "unsupported {MANIFEST_FILE} version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }
}

/// Model repository backed by a directory of JSON exports.
#[derive(Debug)]
pub struct JsonArtifactStore {
    dir: PathBuf,
    manifest: Result<Option<ArtifactManifest>, ModelError>,
    require_manifest: bool,
}

impl JsonArtifactStore {
    /// Open a model directory.
    ///
    /// Never fails: a missing directory or a broken manifest surfaces as
    /// unavailable artifacts when they are loaded.
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>, require_manifest: bool) -> Self {
        let dir = dir.into();
        let manifest_path = dir.join(MANIFEST_FILE);

        let manifest = if manifest_path.exists() {
            ArtifactManifest::read(&manifest_path).map(Some)
        } else {
            Ok(None)
        };

        match &manifest {
            Ok(Some(m)) => tracing::info!(
                "Model directory {:?}: manifest binds {} files",
                dir,
                m.files.len()
            ),
            Ok(None) if require_manifest => {
                tracing::warn!("Model directory {:?} has no {MANIFEST_FILE}; artifacts are refused", dir);
            }
            Ok(None) => tracing::info!("Model directory {:?}: no manifest, digests not checked", dir),
            Err(e) => tracing::warn!("Model directory {:?}: {e}", dir),
        }

        Self {
            dir,
            manifest,
            require_manifest,
        }
    }

    fn verify(&self, file_name: &str, bytes: &[u8]) -> Result<(), ModelError> {
        match &self.manifest {
            Err(e) => Err(e.clone()),
            Ok(None) if self.require_manifest => Err(ModelError::Invalid(format!(
                "{file_name}: {MANIFEST_FILE} is required but missing"
            ))),
            Ok(None) => Ok(()),
            Ok(Some(manifest)) => {
                let expected = manifest.files.get(file_name).ok_or_else(|| {
                    ModelError::Invalid(format!("{file_name} is not listed in {MANIFEST_FILE}"))
                })?;
                if constant_time_eq_str(&sha256_hex(bytes), expected) {
                    Ok(())
                } else {
                    Err(ModelError::Invalid(format!("File hash mismatch for {file_name}")))
                }
            }
        }
    }

    fn read_artifact<T: DeserializeOwned>(&self, file_name: &str) -> Result<T, ModelError> {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            return Err(ModelError::NotFound(file_name.to_string()));
        }
        let bytes =
            fs::read(&path).map_err(|e| ModelError::Invalid(format!("{file_name}: {e}")))?;
        self.verify(file_name, &bytes)?;
        let artifact = serde_json::from_slice(&bytes)
            .map_err(|e| ModelError::Invalid(format!("{file_name}: {e}")))?;
        tracing::debug!("Read artifact {}", file_name);
        Ok(artifact)
    }
}

impl ModelRepository for JsonArtifactStore {
    fn load_classifier(
        &self,
        family: ClassifierFamily,
        sex: Sex,
        horizon: Horizon,
    ) -> Result<Box<dyn RiskClassifier>, ModelError> {
        let file = classifier_file_name(family, sex, horizon);
        let model: Box<dyn RiskClassifier> = match family {
            ClassifierFamily::Lr => {
                let model: LogisticRegression = self.read_artifact(&file)?;
                model.validate()?;
                Box::new(model)
            }
            ClassifierFamily::Svm => {
                let model: LinearSvm = self.read_artifact(&file)?;
                model.validate()?;
                Box::new(model)
            }
            ClassifierFamily::Gbt => {
                let model: GradientBoostedTrees = self.read_artifact(&file)?;
                model.validate()?;
                Box::new(model)
            }
            ClassifierFamily::Mlp => {
                let model: Mlp = self.read_artifact(&file)?;
                model.validate()?;
                Box::new(model)
            }
        };
        Ok(model)
    }

    fn load_survival_forest(&self, sex: Sex) -> Result<Box<dyn SurvivalForest>, ModelError> {
        let forest: RandomSurvivalForest = self.read_artifact(&forest_file_name(sex))?;
        forest.validate()?;
        Ok(Box::new(forest))
    }

    fn load_scaler(&self) -> Result<Box<dyn FeatureScaler>, ModelError> {
        let scaler: DataScaler = self.read_artifact(SCALER_FILE)?;
        scaler.validate()?;
        Ok(Box::new(scaler))
    }
}
