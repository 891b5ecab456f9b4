// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Hirelink CLI - talk to the Hirelink API through obstructed networks.
//!
//! # Examples
//!
//! ```bash
//! # Is the backend reachable?
//! hirelink check
//!
//! # Fetch a resource, falling back to relays if needed
//! hirelink get /jobs
//!
//! # Show which transport delivered it
//! hirelink get /jobs --trace
//!
//! # Writes go direct only
//! hirelink request POST /auth/login --data '{"email":"a@b.c","password":"pw"}'
//!
//! # JSON output
//! hirelink --format json --pretty get /jobs
//!
//! # Follow connectivity changes
//! hirelink watch --interval 10
//!
//! # Point at another backend
//! hirelink config set-url https://api.example.com/api
//! ```

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hirelink_fetch::ApiError;
use hirelink_store::{LogLevel, SettingsStore, StoreError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{check, config, request, watch};

// ============================================================================
// CLI Definition
// ============================================================================

/// Hirelink CLI - resilient access to the Hirelink API.
#[derive(Parser)]
#[command(name = "hirelink")]
#[command(about = "Resilient command-line client for the Hirelink API")]
#[command(long_about = r#"
Hirelink reaches the job marketplace API even when the direct path is
blocked. Reads fall back through alternative transports:

  • Direct Request
  • Script-Tag Relay
  • Public Relay Proxy (third party, can be disabled)

Writes are only ever sent directly.

The API URL is taken from, in order: --api-url, HIRELINK_API_URL,
the saved setting (hirelink config set-url), http://localhost:8000/api.

Examples:
  hirelink check                  # Probe the backend
  hirelink get /jobs              # Read with fallbacks
  hirelink get /jobs --trace      # Show the transport chain
  hirelink watch                  # Follow connectivity changes
"#)]
#[command(version)]
#[command(author = "Hirelink Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'check' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base API URL, overriding environment and saved settings.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Send a GET request.
    #[command(visible_alias = "g")]
    Get(request::GetArgs),

    /// Send a request with any method.
    #[command(visible_alias = "r")]
    Request(request::RequestArgs),

    /// Check backend reachability (default if no command specified).
    #[command(visible_alias = "c")]
    Check,

    /// Follow connectivity changes until interrupted.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Backend unreachable through every transport.
    Unreachable = 2,
    /// Response could not be parsed.
    ParseError = 3,
    /// Timeout.
    Timeout = 4,
    /// Backend answered with an error status.
    HttpError = 5,
}

impl ExitCode {
    /// Exit code for a failed request.
    pub fn for_api_error(error: &ApiError) -> Self {
        match error.primary_cause() {
            ApiError::Network(_) => Self::Unreachable,
            ApiError::Timeout(_) => Self::Timeout,
            ApiError::Parse(_) => Self::ParseError,
            ApiError::Http { .. } => Self::HttpError,
            _ => Self::Error,
        }
    }

    /// Exit code for an error that aborted a command.
    pub fn for_error(error: &anyhow::Error) -> Self {
        if let Some(api) = error.downcast_ref::<ApiError>() {
            return Self::for_api_error(api);
        }
        match error.downcast_ref::<StoreError>() {
            Some(StoreError::Api(api)) => Self::for_api_error(api),
            _ => Self::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("hirelink=debug,info")
    } else {
        EnvFilter::new(format!("hirelink={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = SettingsStore::load_default().await;
    let settings = store.get().await;

    setup_logging(cli.verbose, cli.quiet, settings.log_level);

    let result = match &cli.command {
        Some(Commands::Get(args)) => request::run_get(args, &cli, &settings).await,
        Some(Commands::Request(args)) => request::run(args, &cli, &settings).await,
        Some(Commands::Check) | None => check::run(&cli, &settings).await,
        Some(Commands::Watch(args)) => watch::run(args, &cli, &settings).await,
        Some(Commands::Config(args)) => config::run(args, &cli, &store).await,
    };

    let code = match result {
        Ok(code) => code,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::for_error(&e)
        }
    };

    if code != ExitCode::Success {
        std::process::exit(code as i32);
    }

    Ok(())
}
