use clap::Parser;
use std::path::PathBuf;

use crate::config::{ErrorPolicy, Settings};
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "near-dup-sweep")]
#[command(about = "Delete files whose content nearly duplicates another file in a directory tree")]
pub struct Cli {
    /// Directory to sweep for near-duplicates
    pub path: PathBuf,

    /// TOML settings file; command line flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of parallel threads for hashing (default: number of CPU cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Chunk size in bytes (default: 32000)
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Overlap multiplier applied to the first file's chunk count (default: 1.2)
    #[arg(short, long)]
    pub multiplier: Option<f64>,

    /// Directory for fingerprint records instead of a temporary one
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Leave the temporary scratch directory in place after the run
    #[arg(long)]
    pub keep_scratch: bool,

    /// Decision log file (default: ./delete.log)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Compare records in walk order instead of sorting them by path
    #[arg(long)]
    pub no_sort: bool,

    /// Stop at the first file that fails to hash or delete
    #[arg(long)]
    pub abort_on_error: bool,

    /// Report what would be deleted without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Settings from the config file (or defaults) with command line overrides applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Some(threads) = self.threads {
            settings.threads = Some(threads);
        }
        if let Some(chunk_size) = self.chunk_size {
            settings.chunk_size = chunk_size;
        }
        if let Some(multiplier) = self.multiplier {
            settings.overlap_multiplier = multiplier;
        }
        if let Some(dir) = &self.scratch_dir {
            settings.scratch_dir = Some(dir.clone());
        }
        if let Some(log_file) = &self.log_file {
            settings.log_file = log_file.clone();
        }
        settings.keep_scratch |= self.keep_scratch;
        settings.dry_run |= self.dry_run;
        if self.no_sort {
            settings.sort_records = false;
        }
        if self.abort_on_error {
            settings.on_error = ErrorPolicy::Abort;
        }
        settings.validate()?;
        Ok(settings)
    }
}
