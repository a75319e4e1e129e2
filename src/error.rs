use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while fingerprinting, comparing or deleting files.
#[derive(Error, Debug)]
pub enum SweepError {
    /// A source file could not be opened, read or removed.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A fingerprint record could not be written to or read from the scratch area.
    #[error("Storage error on '{}': {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    /// The scratch area could not be created at startup.
    #[error("Unable to provision scratch area '{}': {source}", .path.display())]
    Provisioning {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Interrupted")]
    Interrupted,
}

impl SweepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn storage(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Storage {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SweepError>;

/// Process exit codes.
///
/// - 0: run completed, every attempted deletion succeeded
/// - 1: unexpected failure
/// - 2: the scratch area could not be provisioned, nothing was touched
/// - 3: run completed but some files failed to hash or delete
/// - 130: interrupted by Ctrl+C (128 + SIGINT)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success = 0,
    GeneralError = 1,
    ProvisioningFailed = 2,
    CompletedWithErrors = 3,
    Interrupted = 130,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Maps a failed run to its exit status.
    pub fn from_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<SweepError>() {
            Some(SweepError::Provisioning { .. }) => Self::ProvisioningFailed,
            Some(SweepError::Interrupted) => Self::Interrupted,
            _ => Self::GeneralError,
        }
    }
}
