mod bootstrap;
mod health;
mod hubspot;
mod offers;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use offerdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tokio::sync::Notify;

#[derive(Debug, Parser)]
#[command(
    name = "offerdesk-server",
    about = "HTTP endpoints for reading and deciding HubSpot deal offers",
    after_help = "Examples:\n  offerdesk-server --config config/offerdesk.toml\n  HUBSPOT_TOKEN=pat-... offerdesk-server --port 9000"
)]
struct Args {
    #[arg(long, help = "Path to a TOML config file (must exist when given)")]
    config: Option<PathBuf>,
    #[arg(long, help = "Override the listen port")]
    port: Option<u16>,
    #[arg(long, help = "Override the log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
}

impl Args {
    fn load_options(self) -> LoadOptions {
        LoadOptions {
            require_file: self.config.is_some(),
            config_path: self.config,
            overrides: ConfigOverrides {
                port: self.port,
                log_level: self.log_level,
                ..ConfigOverrides::default()
            },
        }
    }
}

fn init_logging(config: &AppConfig) {
    use offerdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Args::parse()).await
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.load_options())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config)?;
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    let router = app.router();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { signal.notified().await })
            .await
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        deal_id = "unknown",
        bind_address = %address,
        "offerdesk-server listening"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        deal_id = "unknown",
        grace_secs = grace.as_secs(),
        "offerdesk-server draining in-flight requests"
    );

    shutdown.notify_one();
    match tokio::time::timeout(grace, server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            deal_id = "unknown",
            "in-flight requests did not finish within the grace period"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
