//! Check command - probe backend reachability.

use anyhow::Result;
use hirelink_store::Settings;

use super::build_client;
use crate::output::{CheckOutput, JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Runs the check command.
pub async fn run(cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    let client = build_client(cli, settings)?;
    let connected = client.check_api_connection().await;
    let snapshot = client.connection_snapshot();
    let liveness_url = client.monitor().liveness_url().as_str();

    match cli.format {
        OutputFormat::Json => {
            let output = CheckOutput::new(client.config(), liveness_url, &snapshot);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_check(client.config(), liveness_url, &snapshot));
        }
    }

    Ok(if connected {
        ExitCode::Success
    } else {
        ExitCode::Unreachable
    })
}
