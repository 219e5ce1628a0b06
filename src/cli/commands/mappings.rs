//! `mappings list` and `mappings create`

use super::shared::CommandStats;
use crate::cli::args::CreateArgs;
use crate::codec::Bufr4Codec;
use crate::error::Result;
use crate::template::{TemplateStore, create_template};
use colored::Colorize;
use std::time::Instant;
use tracing::info;

/// Print every template visible in the search path
pub fn run_list() -> Result<CommandStats> {
    let start = Instant::now();
    let store = TemplateStore::from_env();
    let entries = store.list()?;

    if entries.is_empty() {
        println!("{}", "No templates found".yellow());
        println!("Search path:");
        for dir in store.search_path() {
            println!("  {}", dir.display());
        }
    } else {
        for entry in &entries {
            println!("{:<32} {}", entry.name.bold(), entry.path.display());
        }
    }

    Ok(CommandStats {
        templates: entries.len(),
        processing_time: start.elapsed(),
        ..Default::default()
    })
}

/// Write a template skeleton for a descriptor sequence
pub fn run_create(args: &CreateArgs) -> Result<CommandStats> {
    let start = Instant::now();
    args.validate()?;

    let template = create_template(&Bufr4Codec::new(), &args.descriptors, args.table_version)?;
    let json = template.to_json()?;

    let mut stats = CommandStats {
        templates: 1,
        ..Default::default()
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!("Template written to {}", path.display());
            println!("{} {}", "Created".green(), path.display());
            stats
                .output_sizes
                .push((path.display().to_string(), json.len() as u64));
        }
        None => println!("{}", json),
    }

    stats.processing_time = start.elapsed();
    Ok(stats)
}
