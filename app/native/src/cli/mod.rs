//! Command-line interface.

mod commands;

use clap::Parser;
pub use commands::{AddBlockArgs, Cli, Commands};

use crate::core::Result;

/// Parses the process arguments and runs the selected command.
///
/// # Errors
///
/// Returns an error if the command fails.
pub fn run() -> Result<()> { Cli::parse().execute() }
