use std::path::Path;
use std::sync::Mutex;

use log::{error, info, warn};

use crate::matcher::DeletionDecision;

/// Receives every decision and outcome of a sweep.
///
/// The matcher and deleter never log on their own; they report here, so they stay
/// testable without a global logger. All methods default to no-ops.
pub trait Reporter: Send + Sync {
    fn on_match(&self, _decision: &DeletionDecision) {}
    fn on_hash_failed(&self, _path: &Path, _error: &str) {}
    fn on_remove(&self, _path: &Path, _dry_run: bool) {}
    fn on_remove_failed(&self, _path: &Path, _error: &str) {}
}

/// Drops everything.
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Writes the decision log through the `log` facade.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn on_match(&self, decision: &DeletionDecision) {
        info!(
            "'{}','{}' match, keeping the first and deleting the second",
            decision.kept_path.display(),
            decision.removed_path.display()
        );
    }

    fn on_hash_failed(&self, path: &Path, error: &str) {
        error!("Failed to fingerprint '{}': {}", path.display(), error);
    }

    fn on_remove(&self, path: &Path, dry_run: bool) {
        if dry_run {
            info!("Would delete: '{}'", path.display());
        } else {
            info!("Deleting: '{}'", path.display());
        }
    }

    fn on_remove_failed(&self, path: &Path, error: &str) {
        warn!("Failed to delete '{}': {}", path.display(), error);
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn push(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl Reporter for RecordingReporter {
    fn on_match(&self, decision: &DeletionDecision) {
        self.push(format!(
            "match keep={} remove={}",
            decision.kept_path.display(),
            decision.removed_path.display()
        ));
    }

    fn on_hash_failed(&self, path: &Path, error: &str) {
        self.push(format!("hash-failed {} {}", path.display(), error));
    }

    fn on_remove(&self, path: &Path, dry_run: bool) {
        let verb = if dry_run { "would-remove" } else { "remove" };
        self.push(format!("{} {}", verb, path.display()));
    }

    fn on_remove_failed(&self, path: &Path, error: &str) {
        self.push(format!("remove-failed {} {}", path.display(), error));
    }
}
