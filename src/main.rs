//! strokerisk: stroke risk comparison across eight models.
//!
//! Main entry point for the command-line tool.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use strokerisk::adapters::JsonArtifactStore;
use strokerisk::application::ComparisonService;
use strokerisk::config::AppConfig;
use strokerisk::domain::{ImputationTable, ModelParameters};
use strokerisk::RiskFactorRecord;

fn usage() -> String {
    "Usage: strokerisk <record.json | -> [--json]".to_string()
}

fn parse_args() -> Result<(String, bool)> {
    let mut input: Option<String> = None;
    let mut json = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => anyhow::bail!(usage()),
            _ if input.is_none() => input = Some(arg),
            _ => anyhow::bail!(usage()),
        }
    }

    let input = input.ok_or_else(|| anyhow::anyhow!(usage()))?;
    Ok((input, json))
}

fn read_record(input: &str) -> Result<RiskFactorRecord> {
    let content = if input == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read record from stdin")?;
        buf
    } else {
        std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid risk factor record in {input}"))
}

fn main() -> Result<()> {
    let config = AppConfig::from_env_or_default();

    // Stdout carries the table; logs go to stderr unless a file is requested.
    let (writer, _guard) = if config.log_mode.uses_file() {
        if let Some(parent) = config.log_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&config.log_file)
            .with_context(|| format!("Failed to open log file {:?}", config.log_file))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stderr())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    let (input, json) = parse_args()?;

    let parameters = match &config.parameters_path {
        Some(path) => ModelParameters::from_path(path)?,
        None => ModelParameters::embedded()?,
    };
    let imputation = match &config.imputation_path {
        Some(path) => ImputationTable::from_path(path)?,
        None => ImputationTable::embedded()?,
    };
    tracing::info!(
        "Loaded closed-form parameters v{} and imputation table v{}",
        parameters.version,
        imputation.version
    );

    let repository = Arc::new(JsonArtifactStore::open(
        &config.model_dir,
        config.require_manifest,
    ));
    let mut service = ComparisonService::new(parameters, imputation, repository)?;
    service.initialize();

    let record = read_record(&input)?;
    let report = service.compare(&record)?;

    for diagnostic in &report.diagnostics {
        tracing::debug!("{diagnostic}");
    }

    if json {
        let mut value = serde_json::to_value(&report)?;
        value["diagnostics"] = serde_json::json!(report.diagnostic_messages());
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("{}", report.table.render(config.percent_decimals));
    }

    Ok(())
}
