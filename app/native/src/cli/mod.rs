//! CLI module for Starshell.
//!
//! The binary only offers configuration tooling; the core itself is driven
//! by a host through the library API.

mod commands;

use clap::Parser;
pub use commands::{Cli, Commands, ConfigCommands};

use crate::error::StarError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), StarError> {
    let cli = Cli::parse();
    cli.execute()
}
