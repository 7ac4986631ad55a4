#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[cfg(target_os = "linux")]
mod bind;
mod commands;
mod config;
mod local;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::{calls, serve, types};

/// Control plane for filesystem mounts
#[derive(Parser)]
#[command(name = "mountctl")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # List the mount backends in this build
    mountctl types

    # Serve mount calls as JSON lines
    echo '{\"id\":1,\"path\":\"mount/types\"}' | mountctl serve

    # Describe the accepted calls
    mountctl calls
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: config.toml in the platform config dir or $MOUNTCTL_CONFIG_DIR)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer mount calls read as JSON lines from stdin
    Serve(serve::Args),

    /// List available mount types
    Types(types::Args),

    /// Describe the calls accepted by `serve`
    Calls(calls::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref())?;

    if !cli.quiet {
        setup_tracing(cli.verbose, config.log.filter.as_deref());
    }

    match cli.command {
        Commands::Serve(args) => serve::execute(&args, config.control),
        Commands::Types(args) => types::execute(&args, config.control),
        Commands::Calls(args) => calls::execute(&args),
    }
}

/// Set up tracing/logging based on verbosity level
///
/// `RUST_LOG` wins, then `-v`, then the config file's `log.filter`.
fn setup_tracing(verbose: u8, configured: Option<&str>) {
    let filter = match (verbose, configured) {
        (0, Some(configured)) => configured,
        (0, None) => "warn",
        (1, _) => "info",
        (2, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}
