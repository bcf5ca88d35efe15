//! Farmwatch CLI
//!
//! Command-line interface for the smart-farm telemetry dashboard service.

use std::path::PathBuf;

use clap::Parser;
use farmwatch::{load_config, Config};
use tracing::Level;

#[derive(Parser)]
#[command(name = "farmwatch")]
#[command(about = "Smart-farm telemetry dashboard service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Farm backend base URL (overrides config file and environment)
    #[arg(long)]
    api_url: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

impl Args {
    /// Config file (or defaults), then environment, then command line
    fn resolve_config(&self) -> farmwatch::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::debug!("Loading configuration from {:?}", path);
                load_config(path)?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        if let Some(port) = self.dashboard_port {
            config.dashboard.port = port;
        }
        if let Some(api_url) = &self.api_url {
            config.api.base_url = api_url.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = args.resolve_config()?;
    tracing::info!(
        "Starting farmwatch: backend {}, camera relay {}, {} widget override(s)",
        config.api.base_url,
        config.camera.relay_url,
        config.widgets.len()
    );

    farmwatch::run(config).await?;
    Ok(())
}
