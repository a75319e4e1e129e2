pub mod cli;
pub mod config;
pub mod deleter;
pub mod error;
pub mod hasher;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod signal;
pub mod store;

pub use cli::Cli;
pub use config::{ErrorPolicy, Settings};
pub use deleter::{DeletionReport, delete_files};
pub use error::{ExitStatus, SweepError};
pub use hasher::{hash_file_chunks, hash_reader_chunks};
pub use matcher::{DeletionDecision, MatchOutcome, find_matches, is_match};
pub use pipeline::{RunSummary, run, run_files};
pub use report::{LogReporter, RecordingReporter, Reporter, SilentReporter};
pub use scanner::{ScanReport, collect_files, fingerprint_files, fingerprint_tree};
pub use signal::ShutdownFlag;
pub use store::{Fingerprint, FingerprintStore};
