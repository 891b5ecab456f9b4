//! Request commands - send API requests through the fallback chain.

use anyhow::{Context, Result};
use clap::Args;
use hirelink_core::HttpMethod;
use hirelink_store::Settings;
use serde_json::Value;
use tracing::info;

use super::build_client;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the get command.
#[derive(Args)]
pub struct GetArgs {
    /// Endpoint relative to the API URL, or an absolute URL.
    pub endpoint: String,

    /// Show every transport attempted.
    #[arg(long, short)]
    pub trace: bool,
}

/// Arguments for the request command.
#[derive(Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE).
    pub method: String,

    /// Endpoint relative to the API URL, or an absolute URL.
    pub endpoint: String,

    /// JSON request body.
    #[arg(long, short)]
    pub data: Option<String>,

    /// Show every transport attempted.
    #[arg(long, short)]
    pub trace: bool,
}

/// Runs the get command.
pub async fn run_get(args: &GetArgs, cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    send(HttpMethod::Get, &args.endpoint, None, args.trace, cli, settings).await
}

/// Runs the request command.
pub async fn run(args: &RequestArgs, cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    let method: HttpMethod = args.method.parse()?;
    let body = args
        .data
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--data is not valid JSON")?;

    send(method, &args.endpoint, body, args.trace, cli, settings).await
}

async fn send(
    method: HttpMethod,
    endpoint: &str,
    body: Option<Value>,
    trace: bool,
    cli: &Cli,
    settings: &Settings,
) -> Result<ExitCode> {
    let client = build_client(cli, settings)?;
    info!(method = %method, endpoint, base = %client.base_url(), "Sending request");

    let outcome = client.api_request_logged(method, endpoint, body).await;

    match cli.format {
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format_outcome(method, endpoint, &outcome, trace)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if trace {
                eprintln!("{}", formatter.format_attempts(&outcome));
            }
            match &outcome.result {
                Ok(value) => println!("{}", formatter.format_data(value)),
                Err(error) if !cli.quiet => eprintln!("{}", formatter.format_error(error)),
                Err(_) => {}
            }
        }
    }

    Ok(match &outcome.result {
        Ok(_) => ExitCode::Success,
        Err(error) => ExitCode::for_api_error(error),
    })
}
