//! simtempctl - simtemp device control and verification CLI
//!
//! Configures the simulated temperature device through its parameter
//! namespace, streams its telemetry, and runs the built-in verification
//! scenarios.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod completion;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use simtemp_harness::ScenarioKind;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::Context;
use crate::error::CliError;

#[derive(Parser)]
#[command(name = "simtempctl")]
#[command(about = "simtemp device control CLI - configure, stream and verify the simulated sensor")]
#[command(version)]
#[command(long_about = "
simtempctl drives the simtemp simulated temperature device. It writes
parameters to the device's sysfs namespace, streams 16-byte telemetry
records from its character device, and runs verification scenarios that
check configuration, reads, threshold events and urgent readiness.

Use --json for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Telemetry character device
    #[arg(long, global = true, env = "SIMTEMP_DEVICE", value_name = "PATH")]
    device: Option<PathBuf>,

    /// Parameter namespace directory
    #[arg(long, global = true, env = "SIMTEMP_SYSFS_ROOT", value_name = "DIR")]
    sysfs_root: Option<PathBuf>,

    /// Harness settings file (YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream samples from the device
    Read {
        /// Parameter to set before reading (repeatable)
        #[arg(short = 'c', long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Stop after this many milliseconds
        #[arg(short, long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Stop after this many samples
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Write parameters to the device
    Configure {
        /// Assignments to apply, in order
        #[arg(required = true, value_name = "KEY=VALUE")]
        assignments: Vec<String>,

        /// Read every parameter back after writing
        #[arg(long)]
        verify: bool,
    },

    /// Run the verification scenarios
    Test {
        /// Run only these scenarios (config, read, threshold, poll)
        #[arg(long, value_name = "NAME")]
        only: Vec<ScenarioKind>,

        /// Exit non-zero when any scenario fails
        #[arg(long)]
        strict: bool,
    },

    /// Show current parameter values
    Params,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("simtempctl={log_level},simtemp_harness={log_level}").into()
            }),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match execute_command(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let cli_error = e.downcast_ref::<CliError>();
            // The JSON scenario report already carries the verdict.
            let reported = cli.json && matches!(cli_error, Some(CliError::ScenariosFailed { .. }));
            if !reported {
                if cli.json {
                    output::print_error_json(&e);
                } else {
                    output::print_error_human(&e);
                }
            }
            let code = cli_error.map_or(1, CliError::exit_code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}

async fn execute_command(cli: &Cli) -> Result<()> {
    if let Commands::Completion { shell } = &cli.command {
        completion::generate_completion(*shell);
        return Ok(());
    }

    let ctx = Context::build(
        cli.json,
        cli.config.as_deref(),
        cli.device.clone(),
        cli.sysfs_root.clone(),
    )?;

    match &cli.command {
        Commands::Read {
            set,
            timeout_ms,
            count,
        } => commands::read::execute(&ctx, set, *timeout_ms, *count).await,
        Commands::Configure {
            assignments,
            verify,
        } => commands::configure::execute(&ctx, assignments, *verify),
        Commands::Test { only, strict } => commands::test::execute(&ctx, only, *strict).await,
        Commands::Params => commands::params::execute(&ctx),
        Commands::Completion { .. } => Ok(()),
    }
}
