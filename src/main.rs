use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{HumanCount, HumanDuration};
use log::{debug, error, info, warn};

use near_dup_sweep::{Cli, ExitStatus, LogReporter, RunSummary, logging, pipeline, signal};

fn print_summary(summary: &RunSummary, dry_run: bool) {
    let deletion = &summary.deletion;
    if deletion.attempted == 0 {
        println!("{}", "No near-duplicate files found!".green());
    } else if dry_run {
        println!(
            "{}",
            format!("{} file(s) would be deleted", HumanCount(deletion.attempted as u64)).yellow()
        );
    } else {
        println!(
            "{}",
            format!("Deleted {} file(s)", HumanCount(deletion.removed() as u64)).green()
        );
    }

    for (path, reason) in &summary.scan.failures {
        println!("{} '{}': {}", "Not fingerprinted".red(), path.display(), reason);
    }
    for failure in &deletion.failures {
        println!(
            "{} '{}': {}",
            "Not deleted".red(),
            failure.path.display(),
            failure.error
        );
    }
}

fn run(cli: &Cli) -> Result<ExitStatus> {
    let start_time = Instant::now();
    let settings = cli.settings().context("Invalid settings")?;
    logging::init_logger(&settings.log_file, cli.verbose)?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);
    debug!("Settings: {:?}", settings);

    let root = cli
        .path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", cli.path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }
    info!("Target directory: '{}'", root.display());

    let shutdown = signal::install_handler().context("Failed to install Ctrl+C handler")?;
    let summary = pipeline::run(&root, &settings, &LogReporter, &shutdown)
        .with_context(|| format!("Sweep of '{}' failed", root.display()))?;

    print_summary(&summary, settings.dry_run);
    info!(
        "{} comparisons, {} match(es), {} deletion(s) issued",
        HumanCount(summary.comparisons),
        HumanCount(summary.matches as u64),
        HumanCount(summary.deletion.attempted as u64)
    );
    info!("Completed in {}", HumanDuration(start_time.elapsed()));

    if summary.has_errors() {
        warn!(
            "{} file(s) failed to fingerprint, {} failed to delete",
            summary.scan.failures.len(),
            summary.deletion.failures.len()
        );
        return Ok(ExitStatus::CompletedWithErrors);
    }
    Ok(ExitStatus::Success)
}

fn main() {
    let cli = Cli::parse();
    let status = match run(&cli) {
        Ok(status) => status,
        Err(err) => {
            if log::max_level() == log::LevelFilter::Off {
                eprintln!("{} {:#}", "error:".red().bold(), err);
            } else {
                error!("{:#}", err);
            }
            ExitStatus::from_error(&err)
        }
    };
    std::process::exit(status.code());
}
