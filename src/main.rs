use clap::Parser;
use csv2bufr::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        let shutdown_signal = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("Unable to listen for CTRL+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        // Dropping the command future stops the batch between rows
        tokio::select! {
            result = commands::run(args) => result,
            _ = shutdown_signal => {
                eprintln!("\nReceived CTRL+C, stopping after the current row...");
                Err(csv2bufr::Csv2BufrError::processing_interrupted(
                    "Processing interrupted by user",
                ))
            }
        }
    });

    match result {
        Ok(_stats) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", anyhow::Error::from(error));
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("csv2bufr - CSV to WMO BUFR edition 4 encoder");
    println!("============================================");
    println!();
    println!("Convert tabular weather observations into one BUFR message per CSV");
    println!("data row, driven by a JSON mapping template.");
    println!();
    println!("USAGE:");
    println!("    csv2bufr <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    mappings list      List templates in the template search path");
    println!("    mappings create    Create a template skeleton from descriptors");
    println!("    data transform     Convert a CSV file into BUFR messages");
    println!("    help               Show this help message or help for a command");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Increase logging verbosity (repeatable)");
    println!("    -q, --quiet      Show only errors");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Generate a template for a surface observation sequence:");
    println!("    csv2bufr mappings create 301150 301021 301011 301012 12101 --output aws.json");
    println!();
    println!("    # Convert a file, writing messages and GeoJSON sidecars to ./out:");
    println!("    csv2bufr data transform obs.csv --bufr-template aws.json \\");
    println!("                            --output-dir out --json");
    println!();
    println!("ENVIRONMENT:");
    println!("    CSV2BUFR_TEMPLATES         Extra template directory searched first");
    println!("    CSV2BUFR_NULLIFY_INVALID   Set to false to stop on invalid values");
    println!("    CSV2BUFR_NON_ASCII         Set to fail to stop on non-ASCII rows");
}
