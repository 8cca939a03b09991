//! Command-line interface for evalforge.
//!
//! Provides the `generate` and `validate` subcommands.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands, GenerateArgs, ValidateArgs};
