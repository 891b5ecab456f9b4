//! Watch command - follow connectivity changes until interrupted.

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use hirelink_store::Settings;
use tokio::sync::mpsc;
use tracing::info;

use super::build_client;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Check interval in seconds (defaults to the saved setting).
    #[arg(long, short)]
    pub interval: Option<u64>,

    /// Minimum interval to use.
    #[arg(long, default_value = "5")]
    pub min_interval: u64,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, cli: &Cli, settings: &Settings) -> Result<ExitCode> {
    let mut settings = settings.clone();
    let interval = args
        .interval
        .unwrap_or(settings.monitor_interval_secs)
        .max(args.min_interval);
    settings.monitor_interval_secs = interval;

    let client = build_client(cli, &settings)?;
    info!(interval, base = %client.base_url(), "Starting watch mode");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client.on_connection_status_change(move |connected| {
        let _ = tx.send((connected, Utc::now()));
    })?;

    if cli.format == OutputFormat::Text && !cli.quiet {
        println!(
            "Watching {} every {}s. Press Ctrl+C to exit.",
            client.base_url(),
            interval
        );
    }

    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some((connected, at)) = event else { break };
                match cli.format {
                    OutputFormat::Json => println!("{}", json.format_status_event(connected, at)?),
                    OutputFormat::Text => println!("{}", text.format_status_event(connected, at)),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Watch interrupted");
                break;
            }
        }
    }

    subscription.unsubscribe();
    Ok(ExitCode::Success)
}
