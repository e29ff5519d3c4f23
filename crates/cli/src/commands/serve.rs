//! `serve` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use relay::RelayServer;
use tracing::{info, warn};

use super::{load_config, shutdown_signal};
use crate::cli::ServeArgs;

/// Execute the `serve` command
pub async fn run_serve(args: &ServeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config.relay, args);
    config_loader::ConfigLoader::validate(&config).context("Invalid relay configuration")?;

    let relay = config.relay;
    info!(
        bind = %relay.bind_addr(),
        min_lead_ms = relay.min_lead_ms,
        max_delay_ms = relay.max_delay_ms,
        origins = relay.allowed_origins.len(),
        "Configuration loaded"
    );

    if let Some(port) = relay.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let server = RelayServer::bind(relay)
        .await
        .context("Failed to bind relay")?;

    server
        .run(async {
            shutdown_signal().await;
            warn!("Received shutdown signal, stopping relay...");
        })
        .await
        .context("Relay stopped with an error")?;

    info!("gosync relay finished");
    Ok(())
}

/// Apply CLI overrides; they win over both file and environment.
fn apply_overrides(relay: &mut RelayConfig, args: &ServeArgs) {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding bind host from CLI");
        relay.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port, "Overriding port from CLI");
        relay.port = port;
    }
    if let Some(min_lead_ms) = args.min_lead_ms {
        info!(min_lead_ms, "Overriding minimum lead from CLI");
        relay.min_lead_ms = min_lead_ms;
    }
    match args.metrics_port {
        Some(0) => relay.metrics_port = None,
        Some(port) => relay.metrics_port = Some(port),
        None => {}
    }
}
