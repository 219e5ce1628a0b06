//! Shared components for CLI commands
//!
//! This module contains the statistics type, logging setup and progress
//! helpers used by the command implementations.

use crate::cli::args::Args;
use crate::error::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::debug;

/// Statistics reported at the end of a command
#[derive(Debug, Clone, Default)]
pub struct CommandStats {
    /// Number of CSV data rows read
    pub rows_read: usize,
    /// Number of rows encoded successfully
    pub rows_passed: usize,
    /// Number of rows that produced no message
    pub rows_failed: usize,
    /// Number of warnings attached to row results
    pub warnings: usize,
    /// Number of templates listed or created
    pub templates: usize,
    /// Total processing time
    pub processing_time: Duration,
    /// Output files and their sizes in bytes
    pub output_sizes: Vec<(String, u64)>,
}

impl CommandStats {
    /// Calculate total output size in bytes
    pub fn total_output_size(&self) -> u64 {
        self.output_sizes.iter().map(|(_, size)| size).sum()
    }

    /// Format output size in human-readable format
    pub fn format_size(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", bytes, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }

    /// Print a coloured summary of a transform run
    pub fn print_transform_summary(&self) {
        println!();
        println!("{}", "Transform summary".bold());
        println!("  Rows read:     {}", self.rows_read);
        println!(
            "  Encoded:       {}",
            self.rows_passed.to_string().green()
        );
        if self.rows_failed > 0 {
            println!("  Failed:        {}", self.rows_failed.to_string().red());
        } else {
            println!("  Failed:        {}", self.rows_failed);
        }
        if self.warnings > 0 {
            println!("  Warnings:      {}", self.warnings.to_string().yellow());
        }
        println!(
            "  Files written: {} ({})",
            self.output_sizes.len(),
            Self::format_size(self.total_output_size())
        );
        println!("  Elapsed:       {:.2?}", self.processing_time);
    }
}

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("csv2bufr={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .ok();
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Spinner counting rows as they are converted
pub fn create_row_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} rows {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
