// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `serve` subcommand: assemble the relay and run until signalled.

use std::sync::Arc;

use tracing::info;

use tether_bridge::BridgeTransport;
use tether_bus::EventBus;
use tether_config::TetherConfig;
use tether_core::{ChannelTransport, FanoutPublisher, RelayStore, TetherError};
use tether_dispatch::Relay;
use tether_storage::SqliteStore;

use crate::shutdown;

pub async fn run(config: TetherConfig) -> Result<(), TetherError> {
    if config.bridge.command.is_none() {
        return Err(TetherError::Config(
            "no channel adapter configured: set [bridge] command in tether.toml".to_string(),
        ));
    }

    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;

    let bus = Arc::new(EventBus::default());
    let transport = Arc::new(BridgeTransport::new(config.bridge.clone()));

    let relay = Relay::new(
        &config,
        transport as Arc<dyn ChannelTransport>,
        store.clone() as Arc<dyn RelayStore>,
        bus as Arc<dyn FanoutPublisher>,
    );

    let connected = relay.connect_all().await?;
    info!(
        relay = %config.relay.name,
        accounts = connected,
        "relay serving"
    );

    let token = shutdown::install_signal_handler();
    token.cancelled().await;

    info!("draining sessions");
    relay.shutdown().await;
    store.close().await?;
    info!("shutdown complete");
    Ok(())
}
