//! Runtime configuration from environment variables.

use std::path::PathBuf;

/// Largest number of decimals accepted for percentage rendering.
pub const MAX_PERCENT_DECIMALS: usize = 6;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Stderr,
    File,
    /// Stderr, keeping stdout for the table.
    Auto,
}

impl LogMode {
    #[must_use]
    pub fn uses_file(self) -> bool {
        matches!(self, Self::File)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub model_dir: PathBuf,
    /// Replacement closed-form parameter file; `None` uses the compiled-in one
    pub parameters_path: Option<PathBuf>,
    /// Replacement imputation table; `None` uses the compiled-in one
    pub imputation_path: Option<PathBuf>,
    pub require_manifest: bool,
    pub percent_decimals: usize,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            parameters_path: None,
            imputation_path: None,
            require_manifest: false,
            percent_decimals: 1,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("strokerisk.log"),
        }
    }
}

impl AppConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - STROKERISK_MODEL_DIR
    /// - STROKERISK_PARAMETERS
    /// - STROKERISK_IMPUTATION
    /// - STROKERISK_REQUIRE_MANIFEST
    /// - STROKERISK_PERCENT_DECIMALS (0..=6)
    /// - STROKERISK_LOG_MODE ("stderr" | "file" | "auto")
    /// - STROKERISK_LOG_FILE
    #[must_use]
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`AppConfig::from_env_or_default`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var("STROKERISK_MODEL_DIR") {
            cfg.model_dir = PathBuf::from(v);
        }
        cfg.parameters_path = var("STROKERISK_PARAMETERS").map(PathBuf::from);
        cfg.imputation_path = var("STROKERISK_IMPUTATION").map(PathBuf::from);
        cfg.require_manifest = var("STROKERISK_REQUIRE_MANIFEST").is_some_and(|v| parse_bool(&v));

        if let Some(v) = var("STROKERISK_PERCENT_DECIMALS") {
            if let Ok(n) = v.parse::<usize>() {
                if n <= MAX_PERCENT_DECIMALS {
                    cfg.percent_decimals = n;
                }
            }
        }

        if let Some(v) = var("STROKERISK_LOG_MODE") {
            cfg.log_mode = match v.as_str() {
                "stderr" => LogMode::Stderr,
                "file" => LogMode::File,
                _ => LogMode::Auto,
            };
        }
        if let Some(v) = var("STROKERISK_LOG_FILE") {
            cfg.log_file = PathBuf::from(v);
        }

        cfg
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "TRUE" | "yes" | "YES")
}
