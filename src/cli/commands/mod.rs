//! Command implementations for the csv2bufr CLI
//!
//! Each command group is implemented in its own module:
//! - `mappings`: template listing and skeleton creation
//! - `transform`: CSV to BUFR conversion with file output

pub mod mappings;
pub mod shared;
pub mod transform;

pub use shared::CommandStats;

use crate::cli::args::{Args, Commands, DataCommand, MappingsCommand};
use crate::error::Result;

/// Main command runner
///
/// Sets up logging, then dispatches to the handler for the subcommand.
pub async fn run(args: Args) -> Result<CommandStats> {
    shared::setup_logging(&args)?;
    let quiet = args.quiet;

    match args.command {
        Some(Commands::Mappings(MappingsCommand::List)) => mappings::run_list(),
        Some(Commands::Mappings(MappingsCommand::Create(create))) => mappings::run_create(&create),
        Some(Commands::Data(DataCommand::Transform(transform_args))) => {
            transform::run_transform(&transform_args, quiet).await
        }
        None => Ok(CommandStats::default()),
    }
}
