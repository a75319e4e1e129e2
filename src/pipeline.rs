use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::Settings;
use crate::deleter::{DeletionReport, delete_files};
use crate::error::{Result, SweepError};
use crate::matcher::find_matches;
use crate::report::Reporter;
use crate::scanner::{ScanReport, collect_files, fingerprint_files};
use crate::signal::ShutdownFlag;
use crate::store::FingerprintStore;

#[derive(Debug)]
pub struct RunSummary {
    pub scan: ScanReport,
    pub comparisons: u64,
    pub matches: usize,
    pub deletion: DeletionReport,
    pub scratch_dir: PathBuf,
}

impl RunSummary {
    pub fn has_errors(&self) -> bool {
        !self.scan.failures.is_empty() || !self.deletion.failures.is_empty()
    }
}

/// Fingerprints everything under `root`, compares all records and removes near-duplicates.
///
/// Phases run strictly in order: every record is stored before any is read back,
/// and the full deletion set is known before the first file is removed.
pub fn run(
    root: &Path,
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: &ShutdownFlag,
) -> Result<RunSummary> {
    settings.validate()?;
    if let Some(scratch) = &settings.scratch_dir {
        if is_inside(scratch, root) {
            return Err(SweepError::Config(format!(
                "scratch directory '{}' must not be inside the swept tree '{}'",
                scratch.display(),
                root.display()
            )));
        }
    }
    info!("Deleting near-duplicate files from directory: '{}'", root.display());

    let store = FingerprintStore::provision(settings.scratch_dir.as_deref(), settings.keep_scratch)?;
    let (files, total_size) = collect_files(root, settings.sort_records)?;
    sweep(&store, &files, total_size, settings, reporter, shutdown)
}

/// Same as [`run`] for an explicit list of files instead of a walked tree.
pub fn run_files(
    files: &[PathBuf],
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: &ShutdownFlag,
) -> Result<RunSummary> {
    settings.validate()?;
    let store = FingerprintStore::provision(settings.scratch_dir.as_deref(), settings.keep_scratch)?;
    let total_size: u64 = files
        .iter()
        .filter_map(|f| f.metadata().ok())
        .map(|m| m.len())
        .sum();
    sweep(&store, files, total_size, settings, reporter, shutdown)
}

fn sweep(
    store: &FingerprintStore,
    files: &[PathBuf],
    total_size: u64,
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: &ShutdownFlag,
) -> Result<RunSummary> {
    let scratch_dir = store.root().to_path_buf();

    let scan = match fingerprint_files(files, total_size, store, settings, reporter, shutdown) {
        Ok(scan) => scan,
        Err(e) => {
            warn_scratch_left(store, settings);
            return Err(e);
        }
    };

    let mut records = store.list()?;
    if settings.sort_records {
        records.sort_by(|a, b| a.source_path.cmp(&b.source_path));
    }
    let outcome = find_matches(&records, settings.overlap_multiplier, reporter);

    if shutdown.is_requested() {
        warn_scratch_left(store, settings);
        return Err(SweepError::Interrupted);
    }

    let deletion = delete_files(
        &outcome.deletion_set(),
        settings.on_error,
        settings.dry_run,
        reporter,
    )?;

    if settings.dry_run {
        info!("Dry run: {} file(s) would be deleted", deletion.attempted);
    } else {
        info!("Deleted {} file(s)", deletion.removed());
    }

    Ok(RunSummary {
        scan,
        comparisons: outcome.comparisons,
        matches: outcome.decisions.len(),
        deletion,
        scratch_dir,
    })
}

fn is_inside(path: &Path, root: &Path) -> bool {
    resolve(path).starts_with(resolve(root))
}

/// Canonicalizes the nearest existing ancestor of `path` and re-appends the rest,
/// so paths that do not exist yet still see through symlinks.
fn resolve(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            return missing.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}

fn warn_scratch_left(store: &FingerprintStore, settings: &Settings) {
    if settings.scratch_dir.is_some() || settings.keep_scratch {
        warn!("Scratch records left at: '{}'", store.root().display());
    }
}
