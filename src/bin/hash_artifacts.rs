//! Digest manifest utility for strokerisk model directories.
//!
//! Writes `manifest.json` binding every JSON artifact in a model directory
//! to its SHA-256 digest. The artifact store refuses artifacts whose bytes
//! no longer match.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin hash_artifacts -- <model_dir> [--created-at <unix_secs>]
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use strokerisk::adapters::artifacts::{ArtifactManifest, MANIFEST_FILE};

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn usage() -> String {
    "Usage: hash_artifacts <model_dir> [--created-at <unix_secs>]".to_string()
}

fn parse_args() -> Result<(PathBuf, Option<i64>), String> {
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut created_at: Option<i64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--created-at" => {
                let v = args.next().ok_or_else(usage)?;
                let parsed = v
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| "--created-at must be an i64".to_string())?;
                created_at = Some(parsed);
            }
            "-h" | "--help" => return Err(usage()),
            _ => {
                if model_dir.is_none() {
                    model_dir = Some(PathBuf::from(arg));
                } else {
                    return Err(usage());
                }
            }
        }
    }

    let model_dir = model_dir.ok_or_else(usage)?;
    Ok((model_dir, created_at))
}

fn main() -> Result<(), String> {
    let (model_dir, created_at) = parse_args()?;

    if !model_dir.is_dir() {
        return Err(format!("{model_dir:?} is not a directory"));
    }

    let manifest = ArtifactManifest::build(&model_dir, created_at.unwrap_or_else(unix_now))
        .map_err(|e| format!("Failed to hash {model_dir:?}: {e}"))?;

    if manifest.files.is_empty() {
        return Err(format!("No JSON artifacts found in {model_dir:?}"));
    }

    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize manifest: {e}"))?;
    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, json)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote {manifest_path:?}");
    for (name, digest) in &manifest.files {
        println!("  {digest}  {name}");
    }
    Ok(())
}
