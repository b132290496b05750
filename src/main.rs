//! vault-converge CLI entrypoint.
//!
//! This is the main entrypoint for the vault-converge command-line tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use vault_converge::cli::{Cli, Commands, OutputFormatter};
use vault_converge::config::{ConfigParser, ConfigValidator, ConvergeConfig, find_config_file};
use vault_converge::error::Result;
use vault_converge::metrics::ReconcileMetrics;
use vault_converge::planner::ReconcileContext;
use vault_converge::reconciler::Reconciler;
use vault_converge::registry::InstanceRegistry;
use vault_converge::vault::VaultClient;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_json);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Main async entry point. Returns whether the run succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let formatter = OutputFormatter::new(cli.output);
    let config_path = resolve_config_path(cli.config)?;

    match cli.command {
        Commands::Validate => cmd_validate(&config_path, &formatter),
        Commands::Plan { thread_pool_size } => {
            cmd_apply(&config_path, true, thread_pool_size, None, &formatter).await
        }
        Commands::Apply {
            dry_run,
            thread_pool_size,
            metrics_file,
        } => {
            cmd_apply(
                &config_path,
                dry_run,
                thread_pool_size,
                metrics_file.as_deref(),
                &formatter,
            )
            .await
        }
    }
}

/// Uses the explicit path, or searches from the current directory.
fn resolve_config_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => find_config_file(std::env::current_dir()?),
    }
}

/// Loads and validates the configuration. Any failure here is fatal.
fn load_config(path: &Path) -> Result<(ConvergeConfig, Vec<String>)> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let parser = ConfigParser::new().with_base_path(base);
    parser.load_dotenv()?;

    let config = parser.load_file(path)?;
    let result = ConfigValidator::new().validate(&config)?;
    for warning in &result.warnings {
        warn!("{warning}");
    }
    Ok((config, result.warnings))
}

/// Validate the configuration.
fn cmd_validate(path: &Path, formatter: &OutputFormatter) -> Result<bool> {
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let parser = ConfigParser::new().with_base_path(base);
    let config = parser.load_file(path)?;
    let result = ConfigValidator::new().validate(&config)?;

    print_output(&formatter.format_validation(&config, &result))?;
    Ok(true)
}

/// Run the reconciler, live or as a dry run.
async fn cmd_apply(
    path: &Path,
    dry_run: bool,
    thread_pool_size: usize,
    metrics_file: Option<&Path>,
    formatter: &OutputFormatter,
) -> Result<bool> {
    let (config, warnings) = load_config(path)?;
    debug!(warnings = warnings.len(), "Configuration loaded");

    let tokens = ConfigParser::resolve_tokens(&config)?;
    let vault = VaultClient::new(tokens)?;
    let registry = Arc::new(InstanceRegistry::new(config.addresses()));

    let ctx = ReconcileContext {
        vault: Arc::new(vault),
        registry,
        dry_run,
        thread_pool_size,
    };

    if dry_run {
        info!("Dry run: no changes will be applied");
    }

    let reconciler = Reconciler::from_config(&config, ctx);
    let report = reconciler.run().await;

    if let Some(metrics_path) = metrics_file {
        let metrics = ReconcileMetrics::new()?;
        metrics.record_run(&report);
        metrics.write_to(metrics_path)?;
    }

    print_output(&formatter.format_report(&report))?;
    eprintln!("\n{report}");

    Ok(report.success())
}

/// Writes command output to stdout.
fn print_output(output: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{output}")?;
    Ok(())
}
