// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `status` subcommand: per-account connection state from the store.

use std::sync::Arc;

use tether_config::TetherConfig;
use tether_core::{RelayStore, TetherError};
use tether_storage::SqliteStore;

pub async fn run(config: TetherConfig) -> Result<(), TetherError> {
    let store = Arc::new(SqliteStore::new(config.storage.clone()));
    store.initialize().await?;
    store.health_check().await?;

    let accounts = store.list_accounts().await?;
    if accounts.is_empty() {
        println!("no accounts provisioned");
        store.close().await?;
        return Ok(());
    }

    println!("{:<38} {:<10} {:<13} handle", "account", "channel", "status");
    for account in accounts {
        println!(
            "{:<38} {:<10} {:<13} {}",
            account.id,
            account.channel.to_string(),
            account.status.to_string(),
            account.handle.as_deref().unwrap_or("-"),
        );
    }

    store.close().await?;
    Ok(())
}
