//! Command-line argument definitions for csv2bufr
//!
//! This module defines the CLI interface using the clap derive API: a
//! `mappings` group for template management and a `data` group for
//! converting CSV files.

use crate::constants::DEFAULT_MASTER_TABLE_VERSION;
use crate::error::{Csv2BufrError, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the CSV to BUFR encoder
///
/// Converts tabular weather observations into WMO BUFR edition 4 messages
/// using JSON mapping templates.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "csv2bufr",
    author,
    version,
    about = "Convert CSV weather observations into WMO BUFR edition 4 messages",
    long_about = "Converts each data row of a CSV file into one WMO BUFR edition 4 message, \
                  driven by a JSON mapping template that tells the encoder where every BUFR \
                  element comes from. Rows that cannot be encoded are reported and skipped."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Suppress output (quiet mode)
    ///
    /// Only show errors. Overrides verbose settings.
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress progress output, show only errors"
    )]
    pub quiet: bool,
}

/// Available command groups
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Manage mapping templates
    #[command(subcommand)]
    Mappings(MappingsCommand),
    /// Convert data files
    #[command(subcommand)]
    Data(DataCommand),
}

/// Template management commands
#[derive(Debug, Clone, Subcommand)]
pub enum MappingsCommand {
    /// List the templates found in the template search path
    List,
    /// Create a template skeleton from a descriptor sequence
    Create(CreateArgs),
}

/// Data conversion commands
#[derive(Debug, Clone, Subcommand)]
pub enum DataCommand {
    /// Convert a CSV file into one BUFR message per data row
    Transform(TransformArgs),
}

/// Arguments for `mappings create`
#[derive(Debug, Clone, ClapArgs)]
pub struct CreateArgs {
    /// Descriptor sequence, e.g. 301150 301021 012101
    #[arg(value_name = "DESCRIPTOR", required = true, num_args = 1..)]
    pub descriptors: Vec<i64>,

    /// Master table version written to the template
    #[arg(
        long = "table-version",
        value_name = "VERSION",
        default_value_t = DEFAULT_MASTER_TABLE_VERSION
    )]
    pub table_version: i64,

    /// Write the template to this file instead of standard output
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Arguments for `data transform`
#[derive(Debug, Clone, ClapArgs)]
pub struct TransformArgs {
    /// CSV file to convert
    #[arg(value_name = "CSV")]
    pub csv: PathBuf,

    /// Template name from the search path, or a path to a template file
    #[arg(short = 'b', long = "bufr-template", value_name = "NAME|PATH")]
    pub bufr_template: String,

    /// Directory receiving the encoded messages
    #[arg(
        short = 'o',
        long = "output-dir",
        value_name = "DIR",
        default_value = "."
    )]
    pub output_dir: PathBuf,

    /// Also write a GeoJSON feature describing each message
    #[arg(long = "json")]
    pub json: bool,

    /// Stop at the first invalid value instead of setting it to missing
    #[arg(long = "strict")]
    pub strict: bool,
}

impl Args {
    /// Get the log level based on verbosity and quiet flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

impl CreateArgs {
    /// Validate the descriptor sequence before asking the codec for keys
    pub fn validate(&self) -> Result<()> {
        if let Some(descriptor) = self
            .descriptors
            .iter()
            .find(|d| !(0..=363_255).contains(*d))
        {
            return Err(Csv2BufrError::missing_descriptors(format!(
                "'{}' is not an FXXYYY descriptor",
                descriptor
            )));
        }
        if !(0..=255).contains(&self.table_version) {
            return Err(Csv2BufrError::missing_descriptors(format!(
                "table version {} is outside 0-255",
                self.table_version
            )));
        }
        Ok(())
    }
}

impl TransformArgs {
    /// Validate paths before any work starts
    pub fn validate(&self) -> Result<()> {
        if !self.csv.is_file() {
            return Err(Csv2BufrError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("CSV file does not exist: {}", self.csv.display()),
            )));
        }
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(Csv2BufrError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Output path is not a directory: {}", self.output_dir.display()),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_package_metadata_reaches_help() {
        let command = Args::command();
        assert_eq!(command.get_author(), Some(env!("CARGO_PKG_AUTHORS")));
        assert!(!env!("CARGO_PKG_REPOSITORY").is_empty());
        assert_eq!(command.get_version(), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_parse_transform() {
        let args = Args::parse_from([
            "csv2bufr",
            "data",
            "transform",
            "obs.csv",
            "--bufr-template",
            "aws-template",
            "--output-dir",
            "out",
            "--json",
            "-vv",
        ]);
        assert_eq!(args.get_log_level(), "debug");
        match args.command {
            Some(Commands::Data(DataCommand::Transform(transform))) => {
                assert_eq!(transform.csv, PathBuf::from("obs.csv"));
                assert_eq!(transform.bufr_template, "aws-template");
                assert_eq!(transform.output_dir, PathBuf::from("out"));
                assert!(transform.json);
                assert!(!transform.strict);
            }
            other => panic!("Expected data transform, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_create() {
        let args = Args::parse_from(["csv2bufr", "mappings", "create", "301150", "12101"]);
        match args.command {
            Some(Commands::Mappings(MappingsCommand::Create(create))) => {
                assert_eq!(create.descriptors, vec![301150, 12101]);
                assert_eq!(create.table_version, DEFAULT_MASTER_TABLE_VERSION);
                assert!(create.output.is_none());
                assert!(create.validate().is_ok());
            }
            other => panic!("Expected mappings create, got {:?}", other),
        }
    }

    #[test]
    fn test_create_rejects_bad_descriptor() {
        let args = CreateArgs {
            descriptors: vec![301150, 999999],
            table_version: 37,
            output: None,
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_quiet_overrides_verbose() {
        let args = Args::parse_from(["csv2bufr", "-vvv", "--quiet", "mappings", "list"]);
        assert_eq!(args.get_log_level(), "error");
    }

    #[test]
    fn test_no_command() {
        let args = Args::parse_from(["csv2bufr"]);
        assert!(args.command.is_none());
        assert_eq!(args.get_log_level(), "warn");
    }
}
