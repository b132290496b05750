//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::builder::TypedValueParser;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default number of concurrent remote calls per fan-out.
pub const DEFAULT_THREAD_POOL_SIZE: usize = 10;

/// vault-converge - Declarative Vault configuration manager.
#[derive(Parser, Debug)]
#[command(name = "vault-converge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "VAULT_CONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converge every instance on the configuration.
    Apply {
        /// Only report what would change.
        #[arg(long)]
        dry_run: bool,

        /// Maximum concurrent remote calls per fan-out.
        #[arg(
            long,
            env = "VAULT_CONVERGE_THREAD_POOL_SIZE",
            default_value_t = DEFAULT_THREAD_POOL_SIZE,
            value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize)
        )]
        thread_pool_size: usize,

        /// Write Prometheus metrics to this file after the run.
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Show the changes an apply would make.
    Plan {
        /// Maximum concurrent remote calls per fan-out.
        #[arg(
            long,
            env = "VAULT_CONVERGE_THREAD_POOL_SIZE",
            default_value_t = DEFAULT_THREAD_POOL_SIZE,
            value_parser = clap::value_parser!(u32).range(1..).map(|n| n as usize)
        )]
        thread_pool_size: usize,
    },

    /// Validate the configuration without contacting any instance.
    Validate,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}
