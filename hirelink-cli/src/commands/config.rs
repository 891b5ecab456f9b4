//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use hirelink_store::config::parse_base_url;
use hirelink_store::{ResolvedConfig, Settings, SettingsStore, default_config_dir};
use tracing::{info, warn};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Save the preferred API URL.
    SetUrl {
        /// Base API URL, e.g. https://api.example.com/api
        url: String,
    },

    /// Forget the preferred API URL.
    ClearUrl,

    /// Set any setting by name.
    Set {
        /// Setting name, e.g. debounce_window_secs.
        key: String,
        /// New value (JSON, or a plain string).
        value: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli, store: &SettingsStore) -> Result<ExitCode> {
    match &args.action {
        ConfigAction::Show => show_config(cli, store).await?,
        ConfigAction::Path => show_paths(cli, store)?,
        ConfigAction::SetUrl { url } => set_url(url, store).await?,
        ConfigAction::ClearUrl => clear_url(store).await?,
        ConfigAction::Set { key, value } => set_value(key, value, store).await?,
        ConfigAction::Reset => reset_config(store).await?,
    }
    Ok(ExitCode::Success)
}

async fn show_config(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let settings = store.get().await;
    let effective = match ResolvedConfig::resolve(cli.api_url.as_deref(), &settings) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(error = %e, "Effective API URL is invalid");
            None
        }
    };

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_settings(&settings, effective.as_ref()));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "settings": settings,
                "effectiveApiUrl": effective.as_ref().map(|c| c.base_url.to_string()),
                "source": effective.as_ref().map(|c| c.source),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }

    Ok(())
}

fn show_paths(cli: &Cli, store: &SettingsStore) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = store.path();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
            });
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
    }

    Ok(())
}

async fn set_url(url: &str, store: &SettingsStore) -> Result<()> {
    let url = parse_base_url(url)?;
    store.set_api_base_url(Some(url.to_string())).await;
    store.save().await?;

    info!(url = %url, "API URL saved");
    println!("API URL set to: {url}");
    Ok(())
}

async fn clear_url(store: &SettingsStore) -> Result<()> {
    store.set_api_base_url(None).await;
    store.save().await?;

    info!("API URL cleared");
    println!("API URL cleared");
    Ok(())
}

async fn set_value(key: &str, value: &str, store: &SettingsStore) -> Result<()> {
    if key == "api_base_url" {
        parse_base_url(value)?;
    }
    store.try_update(|s| s.set_field(key, value)).await?;
    store.save().await?;

    let settings: Settings = store.get().await;
    let saved = serde_json::to_value(&settings)?
        .get(key)
        .map(ToString::to_string)
        .unwrap_or_default();
    info!(key, value = %saved, "Setting updated");
    println!("{key} set to: {saved}");
    Ok(())
}

async fn reset_config(store: &SettingsStore) -> Result<()> {
    let path = store.path();
    store.reset().await;

    if tokio::fs::try_exists(path).await? {
        tokio::fs::remove_file(path).await?;
        info!(path = %path.display(), "Settings reset");
        println!("Configuration reset to defaults");
    } else {
        println!("No configuration file to reset");
    }

    Ok(())
}
