use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::error::{Result, SweepError};

/// Size of one positional chunk in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 32_000;
/// Union of both chunk sets may grow to this multiple of the left file's chunk count.
pub const DEFAULT_OVERLAP_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_LOG_FILE: &str = "delete.log";

/// What to do when a single file fails to hash or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the failure, keep going, surface it in the final report.
    #[default]
    Continue,
    /// Stop the run on the first failure.
    Abort,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub chunk_size: usize,
    pub overlap_multiplier: f64,
    pub threads: Option<usize>,
    /// Sort records by source path before comparison so re-runs keep the same file.
    pub sort_records: bool,
    pub on_error: ErrorPolicy,
    pub log_file: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub keep_scratch: bool,
    pub dry_run: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap_multiplier: DEFAULT_OVERLAP_MULTIPLIER,
            threads: None,
            sort_records: true,
            on_error: ErrorPolicy::Continue,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            scratch_dir: None,
            keep_scratch: false,
            dry_run: false,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        info!("Loading settings from: '{}'", path.display());
        let text = fs::read_to_string(path).map_err(|e| SweepError::io(path, e))?;
        let settings: Settings = toml::from_str(&text)
            .map_err(|e| SweepError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(SweepError::Config("chunk_size must be greater than zero".into()));
        }
        if !self.overlap_multiplier.is_finite() || self.overlap_multiplier < 1.0 {
            return Err(SweepError::Config(format!(
                "overlap_multiplier must be a finite number >= 1.0, got {}",
                self.overlap_multiplier
            )));
        }
        if self.threads == Some(0) {
            return Err(SweepError::Config("threads must be greater than zero".into()));
        }
        Ok(())
    }

    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}
