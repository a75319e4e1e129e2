use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use time::macros::format_description;

/// Logs to stderr and appends to the decision log at `log_file`.
///
/// The file always receives Info and above, so every kept/removed pair is on disk
/// even when the terminal is quiet.
pub fn init_logger(log_file: &Path, verbose: bool) -> Result<()> {
    let mut builder = ConfigBuilder::new();
    builder.set_time_format_custom(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    // Stays on UTC when the local offset cannot be determined.
    let _ = builder.set_time_offset_to_local();
    let config = builder.build();

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Failed to open log file: '{}'", log_file.display()))?;

    let term_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    CombinedLogger::init(vec![
        TermLogger::new(term_level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Info, config, file),
    ])
    .context("Failed to initialize logger")?;
    Ok(())
}
