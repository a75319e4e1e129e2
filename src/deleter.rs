use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use log::info;

use crate::config::ErrorPolicy;
use crate::error::{Result, SweepError};
use crate::report::Reporter;

#[derive(Debug)]
pub struct DeletionFailure {
    pub path: PathBuf,
    pub error: std::io::Error,
}

#[derive(Debug, Default)]
pub struct DeletionReport {
    /// Deletion attempts issued, successful or not.
    pub attempted: usize,
    pub failures: Vec<DeletionFailure>,
    pub dry_run: bool,
}

impl DeletionReport {
    pub fn removed(&self) -> usize {
        if self.dry_run {
            0
        } else {
            self.attempted - self.failures.len()
        }
    }
}

/// Removes every path in `paths`, once each, reporting before each attempt.
///
/// No existence check and no retry. Under [`ErrorPolicy::Continue`] failures are
/// collected in the report; under [`ErrorPolicy::Abort`] the first one is returned.
/// With `dry_run` nothing is touched but each attempt is still reported and counted.
pub fn delete_files(
    paths: &[PathBuf],
    policy: ErrorPolicy,
    dry_run: bool,
    reporter: &dyn Reporter,
) -> Result<DeletionReport> {
    let mut report = DeletionReport {
        dry_run,
        ..DeletionReport::default()
    };
    let mut issued = HashSet::new();

    for path in paths {
        if !issued.insert(path) {
            continue;
        }
        reporter.on_remove(path, dry_run);
        report.attempted += 1;
        if dry_run {
            continue;
        }
        if let Err(error) = fs::remove_file(path) {
            reporter.on_remove_failed(path, &error.to_string());
            match policy {
                ErrorPolicy::Abort => return Err(SweepError::io(path, error)),
                ErrorPolicy::Continue => report.failures.push(DeletionFailure {
                    path: path.clone(),
                    error,
                }),
            }
        }
    }

    info!(
        "Issued {} deletion(s), {} failed",
        report.attempted,
        report.failures.len()
    );
    Ok(report)
}
