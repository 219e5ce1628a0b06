//! `data transform`: convert a CSV file and write one file per message

use super::shared::{CommandStats, create_row_spinner};
use crate::cli::args::TransformArgs;
use crate::config::TransformConfig;
use crate::constants::{BUFR_EXTENSION, JSON_EXTENSION};
use crate::error::Result;
use crate::models::RowResult;
use crate::template::TemplateStore;
use crate::transform::Transform;
use colored::Colorize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Convert every row of the CSV file, writing `<identifier>.bufr4` and,
/// when requested, `<identifier>.json` for each encoded row.
pub async fn run_transform(args: &TransformArgs, quiet: bool) -> Result<CommandStats> {
    let start = Instant::now();
    args.validate()?;

    let template = TemplateStore::from_env().load(&args.bufr_template)?;
    info!("Loaded template '{}'", args.bufr_template);

    let csv_text = tokio::fs::read_to_string(&args.csv).await?;
    tokio::fs::create_dir_all(&args.output_dir).await?;

    let mut config = TransformConfig::from_env();
    if args.strict {
        config = config.strict();
    }
    debug!("Transform configuration: {:?}", config);

    let spinner = create_row_spinner(quiet);
    let mut stats = CommandStats::default();
    let results = Transform::new(&template).with_config(config).run(&csv_text)?;

    for result in results {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                spinner.abandon_with_message("aborted");
                return Err(e);
            }
        };
        stats.rows_read += 1;
        stats.warnings += result.warnings.len();
        spinner.inc(1);

        if result.is_passed() {
            stats.rows_passed += 1;
            write_outputs(&result, &args.output_dir, args.json, &mut stats).await?;
        } else {
            stats.rows_failed += 1;
            report_failure(&result, quiet);
        }

        // Gives the ctrl-c handler a chance to stop the batch between rows
        tokio::task::yield_now().await;
    }

    spinner.finish_and_clear();
    stats.processing_time = start.elapsed();
    if !quiet {
        stats.print_transform_summary();
    }
    Ok(stats)
}

async fn write_outputs(
    result: &RowResult,
    output_dir: &Path,
    json: bool,
    stats: &mut CommandStats,
) -> Result<()> {
    if let Some(bytes) = &result.bytes {
        let path = output_dir.join(format!("{}.{}", result.identifier, BUFR_EXTENSION));
        tokio::fs::write(&path, bytes).await?;
        debug!("Wrote {}", path.display());
        stats
            .output_sizes
            .push((path.display().to_string(), bytes.len() as u64));
    }

    if json {
        let path = output_dir.join(format!("{}.{}", result.identifier, JSON_EXTENSION));
        let feature = serde_json::to_string_pretty(&result.to_feature())?;
        tokio::fs::write(&path, &feature).await?;
        stats
            .output_sizes
            .push((path.display().to_string(), feature.len() as u64));
    }

    Ok(())
}

fn report_failure(result: &RowResult, quiet: bool) {
    // Row diagnostics were already logged as they were recorded
    if !quiet {
        let reason = result
            .errors
            .first()
            .or(result.warnings.first())
            .map(String::as_str)
            .unwrap_or("no message produced");
        eprintln!("{} row {}: {}", "Failed".red(), result.row, reason);
    }
}
