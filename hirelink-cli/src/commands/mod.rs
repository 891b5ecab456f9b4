//! CLI command implementations.

pub mod check;
pub mod config;
pub mod request;
pub mod watch;

use anyhow::Result;
use hirelink_store::{ApiClient, ResolvedConfig, Settings};

use crate::Cli;

/// Builds a client from the command line and the saved settings.
pub fn build_client(cli: &Cli, settings: &Settings) -> Result<ApiClient> {
    let config = ResolvedConfig::resolve(cli.api_url.as_deref(), settings)?;
    Ok(ApiClient::new(config, settings)?)
}
