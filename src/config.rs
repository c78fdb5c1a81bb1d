use crate::constants::{
    DEFAULT_BASE_URL, DEFAULT_MAX_PACKAGE_INDEX, DEFAULT_REFERENCE_VERSION, DEFAULT_TAIL_COUNT,
};
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved configuration with all values filled in (no Options).
///
/// This struct represents the mirror defaults and can be deserialized by the
/// TOML loader. All fields have concrete values, making it safe to access
/// directly without unwrapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Vendor update endpoint; version paths are appended to it
    pub base_url: String,
    /// Version whose changelog is fetched to enumerate releases
    pub reference_version: String,
    /// How many of the newest changelog entries to process
    pub tail_count: usize,
    /// Highest pkg<N>.fpk index probed per version (inclusive).
    /// The real package count is unknown; indices past it just 404.
    pub max_package_index: u32,
    /// Root of the local mirror tree (host/path layout below it)
    pub output_dir: PathBuf,

    // Downloads
    /// Number of concurrent package downloads within one version
    pub concurrent_downloads: usize,
    /// Maximum number of retry attempts for failed downloads
    pub max_retries: u32,
    /// Initial delay in milliseconds before the first retry
    pub retry_initial_delay_ms: u64,
    /// Maximum delay in milliseconds between retries
    pub retry_max_delay_ms: u64,

    /// Emit per-URL diagnostics at debug level
    pub verbose: bool,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            reference_version: DEFAULT_REFERENCE_VERSION.to_string(),
            tail_count: DEFAULT_TAIL_COUNT,
            max_package_index: DEFAULT_MAX_PACKAGE_INDEX,
            output_dir: PathBuf::from("data/mirror"),
            concurrent_downloads: 4,
            max_retries: 3,
            retry_initial_delay_ms: 1000,
            retry_max_delay_ms: 10000,
            verbose: false,
        }
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// The parser rejects unknown keys to catch typos, and validates that
/// tail_count and concurrent_downloads are greater than 0.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolvedConfigFile {
    /// Only list discovered versions, without probing or mirroring (defaults to `false`)
    #[serde(default)]
    pub list_only: bool,
    /// Flattened resolved configuration with mirror defaults
    #[serde(flatten)]
    pub resolved: ResolvedConfig,
}

impl ResolvedConfigFile {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, unknown keys are
    /// present, or tail_count/concurrent_downloads are not positive.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ResolvedConfigFile = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;

        if config.resolved.tail_count == 0 {
            return Err(AppError::InvalidInput(
                "Tail count must be greater than 0".into(),
            ));
        }
        if config.resolved.concurrent_downloads == 0 {
            return Err(AppError::InvalidInput(
                "Concurrent downloads must be greater than 0".into(),
            ));
        }

        Ok(config)
    }
}
