//! End-to-end comparison against a temporary model directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;

use strokerisk::adapters::artifacts::{
    classifier_file_name, forest_file_name, ArtifactManifest, MANIFEST_FILE, SCALER_FILE,
};
use strokerisk::adapters::JsonArtifactStore;
use strokerisk::application::ComparisonService;
use strokerisk::domain::features::{ml_feature_names, ML_FEATURE_COUNT};
use strokerisk::domain::{ClassifierFamily, ImputationTable, ModelParameters, RiskCell};
use strokerisk::{Horizon, ModelKind, RiskFactorRecord, Sex};

const EPS: f64 = 1e-12;

fn write_json(dir: &Path, name: &str, value: &Value) {
    fs::write(dir.join(name), serde_json::to_vec(value).expect("serialize")).expect("write");
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// `age_at_study_date` (age / 10) of the fixture record.
const AGE: f64 = 4.3;
/// The scaler maps every feature `x` to `(x - 1) / 2`.
const SCALED_AGE: f64 = (AGE - 1.0) / 2.0;

fn age_index() -> usize {
    ml_feature_names()
        .iter()
        .position(|n| *n == "age_at_study_date")
        .expect("age column")
}

/// Weight vector with `weight` on the age column only.
fn age_weights(weight: f64) -> Vec<f64> {
    let mut weights = vec![0.0; ML_FEATURE_COUNT];
    weights[age_index()] = weight;
    weights
}

/// Every artifact, with the MLP family only when `with_mlp` is set.
///
/// Each model reads the age column, so a model fed the scaled vector gives
/// a different answer from one fed the raw vector.
fn model_dir(with_mlp: bool) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let names = ml_feature_names();
    let age = age_index();
    let kernel: Vec<Vec<f64>> = age_weights(1.0).into_iter().map(|w| vec![w]).collect();

    for sex in Sex::ALL {
        for horizon in Horizon::ALL {
            write_json(
                dir.path(),
                &classifier_file_name(ClassifierFamily::Lr, sex, horizon),
                &json!({ "weights": age_weights(0.5), "intercept": -2.0, "feature_names": names }),
            );
            write_json(
                dir.path(),
                &classifier_file_name(ClassifierFamily::Svm, sex, horizon),
                &json!({
                    "weights": age_weights(1.0),
                    "intercept": 0.0,
                    "platt_a": -1.0,
                    "platt_b": 0.0
                }),
            );
            write_json(
                dir.path(),
                &classifier_file_name(ClassifierFamily::Gbt, sex, horizon),
                &json!({
                    "n_features": ML_FEATURE_COUNT,
                    "init_score": -3.0,
                    "learning_rate": 0.1,
                    "trees": [{ "nodes": [
                        { "feature": age, "threshold": 3.0, "left": 1, "right": 2 },
                        { "value": 1.0 },
                        { "value": 2.0 }
                    ]}]
                }),
            );
            if with_mlp {
                write_json(
                    dir.path(),
                    &classifier_file_name(ClassifierFamily::Mlp, sex, horizon),
                    &json!({
                        "layers": [{ "kernel": kernel, "bias": [0.0], "activation": "sigmoid" }],
                        "feature_names": names
                    }),
                );
            }
        }
        write_json(
            dir.path(),
            &forest_file_name(sex),
            &json!({
                "n_features": ML_FEATURE_COUNT,
                "unique_death_times": [1.0, 3.0, 6.0, 9.0, 12.0],
                "trees": [{ "nodes": [
                    { "feature": age, "threshold": 3.0, "left": 1, "right": 2 },
                    { "value": [0.02, 0.06, 0.12, 0.18, 0.24] },
                    { "value": [0.01, 0.03, 0.06, 0.09, 0.12] }
                ]}]
            }),
        );
    }

    write_json(
        dir.path(),
        SCALER_FILE,
        &json!({
            "kind": "standard",
            "mean": vec![1.0; ML_FEATURE_COUNT],
            "scale": vec![2.0; ML_FEATURE_COUNT]
        }),
    );
    dir
}

fn service(dir: &Path, require_manifest: bool) -> ComparisonService<JsonArtifactStore> {
    let mut service = ComparisonService::new(
        ModelParameters::embedded().expect("Embedded parameters"),
        ImputationTable::embedded().expect("Embedded imputation"),
        Arc::new(JsonArtifactStore::open(dir, require_manifest)),
    )
    .expect("Should create service");
    service.initialize();
    service
}

fn fixture() -> RiskFactorRecord {
    serde_json::from_str(include_str!("fixtures/haikou_female.json")).expect("Fixture should parse")
}

fn value(cell: Option<&RiskCell>) -> f64 {
    cell.and_then(RiskCell::value).expect("cell should be available")
}

#[test]
fn test_full_pipeline_with_missing_mlp() {
    let dir = model_dir(false);
    let report = service(dir.path(), false)
        .compare(&fixture())
        .expect("Should compare");
    let table = &report.table;

    assert!((value(table.cell(ModelKind::Fsrp, Horizon::NineYear)) - 0.002119355694873315).abs() < EPS);
    assert!((value(table.cell(ModelKind::CkbCox, Horizon::NineYear)) - 0.04080074340661932).abs() < EPS);

    for horizon in Horizon::ALL {
        assert!(table.cell(ModelKind::Lr, horizon).is_some_and(RiskCell::is_available));
        assert!(table.cell(ModelKind::Svm, horizon).is_some_and(RiskCell::is_available));
        assert!(table.cell(ModelKind::Gbt, horizon).is_some_and(RiskCell::is_available));
        assert!(!table
            .cell(ModelKind::Mlp, horizon)
            .is_some_and(RiskCell::is_available));
    }

    let rsf_nine = value(table.cell(ModelKind::Rsf, Horizon::NineYear));
    assert!((rsf_nine - (1.0 - (-0.09f64).exp())).abs() < EPS);
    let rsf_last = value(table.cell(ModelKind::Rsf, Horizon::SixToNine));
    assert!((rsf_last - ((-0.06f64).exp() - (-0.09f64).exp())).abs() < EPS);

    // One diagnostic per missing MLP horizon
    assert_eq!(report.diagnostics.len(), 4);
    let rendered = table.render(1);
    assert!(rendered.contains("9-year Stroke Risk"));
    assert!(rendered.contains("n/a"));
}

#[test]
fn test_scaler_applies_to_svm_and_mlp_only() {
    let dir = model_dir(true);
    let report = service(dir.path(), false)
        .compare(&fixture())
        .expect("Should compare");
    let table = &report.table;
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);

    for horizon in Horizon::ALL {
        // Scaled input
        assert!((value(table.cell(ModelKind::Svm, horizon)) - sigmoid(SCALED_AGE)).abs() < EPS);
        assert!((value(table.cell(ModelKind::Mlp, horizon)) - sigmoid(SCALED_AGE)).abs() < EPS);

        // Raw input: age 4.3 is above the 3.0 split, scaled 1.65 would not be
        assert!((value(table.cell(ModelKind::Lr, horizon)) - sigmoid(0.5 * AGE - 2.0)).abs() < EPS);
        assert!((value(table.cell(ModelKind::Gbt, horizon)) - sigmoid(-3.0 + 0.1 * 2.0)).abs() < EPS);
    }

    // The forest takes the raw-age branch too
    let rsf_nine = value(table.cell(ModelKind::Rsf, Horizon::NineYear));
    assert!((rsf_nine - (1.0 - (-0.09f64).exp())).abs() < EPS);
}

#[test]
fn test_json_report_shape() {
    let dir = model_dir(false);
    let mut record = fixture();
    record.id = Some("case-7".to_string());
    let report = service(dir.path(), false)
        .compare(&record)
        .expect("Should compare");

    let value = serde_json::to_value(&report).expect("serialize report");
    assert_eq!(value["patient_id"], "case-7");
    assert_eq!(value["sex"], "Female");
    assert!(value["id"].as_str().is_some_and(|id| id.len() == 36));
    assert!(value["imputed_fields"].is_array());
}

#[test]
fn test_manifest_binds_artifacts() {
    let dir = model_dir(false);
    let manifest = ArtifactManifest::build(dir.path(), 1_700_000_000).expect("build manifest");
    assert_eq!(manifest.files.len(), 3 * 4 * 2 + 2 + 1);
    write_json(
        dir.path(),
        MANIFEST_FILE,
        &serde_json::to_value(&manifest).expect("serialize manifest"),
    );

    let report = service(dir.path(), true)
        .compare(&fixture())
        .expect("Should compare");
    assert!(report
        .table
        .cell(ModelKind::Lr, Horizon::NineYear)
        .is_some_and(RiskCell::is_available));

    // Tampering with one artifact makes only that cell unavailable
    let tampered = classifier_file_name(ClassifierFamily::Lr, Sex::Female, Horizon::NineYear);
    write_json(
        dir.path(),
        &tampered,
        &json!({ "weights": age_weights(0.5), "intercept": 5.0 }),
    );
    let report = service(dir.path(), true)
        .compare(&fixture())
        .expect("Should compare");
    assert!(!report
        .table
        .cell(ModelKind::Lr, Horizon::NineYear)
        .is_some_and(RiskCell::is_available));
    assert!(report
        .table
        .cell(ModelKind::Lr, Horizon::ZeroToThree)
        .is_some_and(RiskCell::is_available));
}

#[test]
fn test_required_manifest_missing_keeps_closed_forms() {
    let dir = model_dir(false);
    let report = service(dir.path(), true)
        .compare(&fixture())
        .expect("Should compare");

    for model in [ModelKind::Fsrp, ModelKind::RecalibratedFsrp, ModelKind::CkbCox] {
        assert!(report
            .table
            .cell(model, Horizon::NineYear)
            .is_some_and(RiskCell::is_available));
    }
    for model in [ModelKind::Rsf, ModelKind::Lr, ModelKind::Svm, ModelKind::Gbt] {
        assert!(!report
            .table
            .cell(model, Horizon::NineYear)
            .is_some_and(RiskCell::is_available));
    }
}

#[test]
fn test_validation_error_is_fatal() {
    let dir = model_dir(false);
    let record = fixture()
        .with("highest_education_0", 1.0)
        .and_then(|r| r.with("highest_education_1", 1.0))
        .expect("Known fields");
    assert!(matches!(
        service(dir.path(), false).compare(&record),
        Err(strokerisk::StrokeRiskError::Validation(_))
    ));
}
