use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::config::{ErrorPolicy, Settings};
use crate::error::{Result, SweepError};
use crate::hasher::hash_file_chunks;
use crate::report::Reporter;
use crate::signal::ShutdownFlag;
use crate::store::{Fingerprint, FingerprintStore};

#[derive(Debug, Default)]
pub struct ScanReport {
    pub files_found: usize,
    pub fingerprinted: usize,
    /// Files that could not be hashed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// Lists every regular file under `root`, descending into all subdirectories.
///
/// Symlinks are not followed and not returned. With `sorted`, entries come out in
/// file name order within each directory, making the listing reproducible.
pub fn collect_files(root: &Path, sorted: bool) -> Result<(Vec<PathBuf>, u64)> {
    info!("Scanning {}", root.display());

    let pb = ProgressBar::new_spinner();
    pb.set_message("Scanning files and directories...");
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let mut walker = WalkDir::new(root).follow_links(false);
    if sorted {
        walker = walker.sort_by_file_name();
    }

    let mut files = Vec::new();
    let mut total_dirs = 0u64;
    let mut total_size = 0u64;
    for entry in walker {
        pb.tick();
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                // The root itself must be readable; anything deeper is logged and skipped.
                if e.depth() == 0 {
                    pb.finish_and_clear();
                    let path = e.path().unwrap_or(root).to_path_buf();
                    return Err(SweepError::io(path, e.into()));
                }
                warn!("Failed to read directory entry: {}", e);
                continue;
            }
        };
        let file_type = entry.file_type();
        if file_type.is_dir() {
            total_dirs += 1;
        } else if file_type.is_file() {
            total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
            files.push(entry.into_path());
        } else {
            debug!("Skipping non-regular entry: '{}'", entry.path().display());
        }
    }
    pb.finish_and_clear();

    info!(
        "Found {} files and {} directories ({})",
        HumanCount(files.len() as u64),
        HumanCount(total_dirs),
        HumanBytes(total_size)
    );
    Ok((files, total_size))
}

/// Walks `root`, fingerprints every file on a bounded worker pool and stores each record.
pub fn fingerprint_tree(
    root: &Path,
    store: &FingerprintStore,
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: &ShutdownFlag,
) -> Result<ScanReport> {
    let (file_paths, total_size) = collect_files(root, settings.sort_records)?;
    fingerprint_files(&file_paths, total_size, store, settings, reporter, shutdown)
}

/// Fingerprints `file_paths` on a bounded worker pool and stores each record.
///
/// Returns once every `put` has completed. Hash failures follow `settings.on_error`;
/// a storage failure always ends the run since the comparison would be incomplete.
pub fn fingerprint_files(
    file_paths: &[PathBuf],
    total_size: u64,
    store: &FingerprintStore,
    settings: &Settings,
    reporter: &dyn Reporter,
    shutdown: &ShutdownFlag,
) -> Result<ScanReport> {
    let progress_bar = ProgressBar::new(total_size);
    progress_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg} ETA: {eta}",
        )
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(settings.num_threads())
        .build()
        .map_err(|e| SweepError::Config(format!("failed to build worker pool: {e}")))?;

    let stop = AtomicBool::new(false);
    let fingerprinted = AtomicUsize::new(0);
    let bytes_processed = AtomicU64::new(0);
    let failures = Mutex::new(Vec::new());
    let fatal: Mutex<Option<SweepError>> = Mutex::new(None);

    info!("Fingerprinting {} files...", file_paths.len());
    pool.install(|| {
        file_paths.par_iter().for_each(|path| {
            if stop.load(Ordering::Relaxed) || shutdown.is_requested() {
                return;
            }

            let outcome = hash_file_chunks(path, settings.chunk_size)
                .map(|digests| Fingerprint::new(path.clone(), digests));
            let fingerprint = match outcome {
                Ok(fingerprint) => fingerprint,
                Err(e) => {
                    reporter.on_hash_failed(path, &e.to_string());
                    if let Ok(mut failures) = failures.lock() {
                        failures.push((path.clone(), e.to_string()));
                    }
                    if settings.on_error == ErrorPolicy::Abort {
                        record_fatal(&fatal, &stop, e);
                    }
                    return;
                }
            };

            if let Err(e) = store.put(&fingerprint) {
                record_fatal(&fatal, &stop, e);
                return;
            }

            let done = fingerprinted.fetch_add(1, Ordering::Relaxed) + 1;
            let size = path.metadata().map(|m| m.len()).unwrap_or(0);
            let bytes = bytes_processed.fetch_add(size, Ordering::Relaxed) + size;
            progress_bar.set_position(bytes);
            progress_bar.set_message(format!(
                "Fingerprinted {} files ({})",
                HumanCount(done as u64),
                HumanBytes(bytes)
            ));
        });
    });
    progress_bar.finish_and_clear();

    if let Some(e) = fatal.into_inner().ok().flatten() {
        return Err(e);
    }
    if shutdown.is_requested() {
        return Err(SweepError::Interrupted);
    }

    let report = ScanReport {
        files_found: file_paths.len(),
        fingerprinted: fingerprinted.into_inner(),
        failures: failures.into_inner().unwrap_or_default(),
    };
    info!(
        "Fingerprinted {} of {} files ({} failed)",
        HumanCount(report.fingerprinted as u64),
        HumanCount(report.files_found as u64),
        report.failures.len()
    );
    Ok(report)
}

fn record_fatal(slot: &Mutex<Option<SweepError>>, stop: &AtomicBool, error: SweepError) {
    stop.store(true, Ordering::Relaxed);
    if let Ok(mut slot) = slot.lock() {
        slot.get_or_insert(error);
    }
}
