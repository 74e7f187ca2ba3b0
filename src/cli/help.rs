//! CLI command names for logging.

use crate::cli::parse::Commands;

/// Stable command name (e.g. "build", "sweep").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Ingest { .. } => "ingest",
        Commands::Build { .. } => "build",
        Commands::Turn { .. } => "turn",
        Commands::Sweep { .. } => "sweep",
        Commands::Stats { .. } => "stats",
        Commands::Sources { .. } => "sources",
        Commands::Config { .. } => "config",
    }
}
