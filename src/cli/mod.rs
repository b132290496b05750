//! CLI module for the vault-converge tool.
//!
//! This module provides the command-line interface for converging Vault
//! instances on a declarative configuration.

mod commands;
mod output;

pub use commands::{Cli, Commands, DEFAULT_THREAD_POOL_SIZE, OutputFormat};
pub use output::OutputFormatter;
