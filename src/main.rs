//! Replicant demo binary.
//!
//! Wires a [`ServerReplicator`] and a couple of [`ClientReplicator`]s
//! together over the in-process [`ChannelTransport`], to exercise the
//! protocol end to end without a real network stack. The composition root
//! shape (load config, init logging, spawn the long-running tasks) mirrors
//! this codebase's existing `main.rs`.

use replicant::client::ClientReplicator;
use replicant::config::load_config;
use replicant::server::ServerReplicator;
use replicant::transport::channel::ChannelTransport;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    tracing::info!(
        server_room_prefix = %cfg.server_room_prefix,
        history_cap = cfg.history_cap,
        "starting replicant demo"
    );

    let (hub, inbound_rx) = ChannelTransport::new();
    let server = Arc::new(ServerReplicator::new(cfg.clone(), hub.clone()));
    tokio::spawn(server.clone().run(inbound_rx));

    let (socket_a, rx_a) = hub.connect();
    let client_a = Arc::new(ClientReplicator::new(cfg.clone(), hub.clone(), socket_a));
    tokio::spawn(client_a.clone().run(rx_a));

    let (socket_b, rx_b) = hub.connect();
    let client_b = Arc::new(ClientReplicator::new(cfg.clone(), hub.clone(), socket_b));
    tokio::spawn(client_b.clone().run(rx_b));

    let board_a = client_a.get_replicant("board").await;
    board_a.wait_ready().await;
    let board_b = client_b.get_replicant("board").await;
    board_b.wait_ready().await;

    tracing::info!("both clients registered for replicant \"board\"");

    client_a.set("board", json!({"cells": [null, null, null]})).await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    tracing::info!(value = %board_b.value().await.unwrap(), "client B observed client A's set");

    client_a.edit("board", |v| v["cells"][0] = json!("x")).await?;
    tokio::time::sleep(Duration::from_millis(20)).await;
    tracing::info!(value = %board_b.value().await.unwrap(), "client B observed client A's incremental edit");

    Ok(())
}
