//! `connect` command implementation.

use anyhow::{Context, Result};
use client::{ClientEvent, SyncClient};
use contracts::RoomId;
use tracing::{info, warn};

use super::{load_config, shutdown_signal};
use crate::cli::ConnectArgs;

/// Execute the `connect` command
pub async fn run_connect(args: &ConnectArgs) -> Result<()> {
    let room_id = RoomId::parse(&args.room)
        .with_context(|| format!("Invalid room id: {:?}", args.room))?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(ref server) = args.server {
        info!(server = %server, "Overriding server URL from CLI");
        config.client.server_url = server.clone();
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid client configuration")?;

    let client = SyncClient::new(config.client).context("Failed to create sync client")?;
    let (handle, mut events) = client.spawn();
    handle.join(room_id).await?;

    let mut start_pending = args.start;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    warn!("Client stopped unexpectedly");
                    break;
                };
                println!("{}", render(&event));
                match event {
                    ClientEvent::Joined { .. } => {
                        if let Some(delay_ms) = start_pending.take() {
                            info!(delay_ms, "Requesting start");
                            handle.start(Some(delay_ms)).await?;
                        }
                    }
                    ClientEvent::Go { .. } if args.once => break,
                    _ => {}
                }
            }
            _ = &mut shutdown => {
                warn!("Received shutdown signal, disconnecting...");
                break;
            }
        }
    }

    let summary = handle.shutdown().await?;
    println!("{summary}");
    Ok(())
}

/// One console line per event
fn render(event: &ClientEvent) -> String {
    match event {
        ClientEvent::Connected { url } => format!("connected to {url}"),
        ClientEvent::Synced {
            offset_ms,
            best_rtt_ms: Some(rtt),
            samples,
        } => format!("offset {offset_ms:+.1} ms (rtt {rtt} ms, {samples} samples)"),
        ClientEvent::Synced {
            offset_ms,
            best_rtt_ms: None,
            ..
        } => format!("offset {offset_ms:+.1} ms (no replies, kept previous)"),
        ClientEvent::Joined { room_id } => format!("joined room {room_id}"),
        ClientEvent::StartScheduled { start_at } => format!("start scheduled at {start_at}"),
        ClientEvent::Countdown { remaining_ms, .. } => {
            format!("{:.3}", remaining_ms.max(0.0) / 1000.0)
        }
        ClientEvent::Go { .. } => "GO!".to_string(),
        ClientEvent::Disconnected { retry_in } => {
            format!("disconnected, retrying in {:.1}s", retry_in.as_secs_f64())
        }
    }
}
