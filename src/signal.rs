//! Ctrl+C handling.
//!
//! An interrupt never kills the process mid-write: it raises a flag that the
//! walk checks per file and the pipeline checks before comparing and before
//! deleting. Nothing is deleted after the flag is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

/// Installs the process-wide Ctrl+C handler and returns the flag it raises.
pub fn install_handler() -> Result<ShutdownFlag, ctrlc::Error> {
    let shutdown = ShutdownFlag::new();
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        if !handler_flag.is_requested() {
            warn!("Interrupted, stopping before any further deletion...");
        }
        handler_flag.request();
    })?;
    Ok(shutdown)
}
