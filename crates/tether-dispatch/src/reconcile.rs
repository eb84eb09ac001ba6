// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pending-message reconciliation sweep.
//!
//! A transport that dies between the optimistic write and the ack would
//! otherwise leave a message `pending` forever. The sweep periodically
//! fails outbound messages that sat in `pending` past the configured
//! threshold, so every message reaches a terminal state.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tether_config::model::SessionConfig;
use tether_core::types::{FanoutEvent, MessageStatus};
use tether_core::{FanoutPublisher, RelayStore};

/// Failure reason recorded by the sweep.
pub const REASON_STALE: &str = "stale: no transport acknowledgment";

/// Low-frequency task guaranteeing no message stays `pending` indefinitely.
pub struct ReconcileSweep {
    store: Arc<dyn RelayStore>,
    fanout: Arc<dyn FanoutPublisher>,
    config: SessionConfig,
}

impl ReconcileSweep {
    pub fn new(
        store: Arc<dyn RelayStore>,
        fanout: Arc<dyn FanoutPublisher>,
        config: SessionConfig,
    ) -> Self {
        Self { store, fanout, config }
    }

    /// Spawn the periodic sweep loop; it stops when `token` is cancelled.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> tokio::task::JoinHandle<()> {
        let interval = std::time::Duration::from_secs(self.config.reconcile_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!("reconcile sweep stopped");
                        return;
                    }
                    _ = ticker.tick() => {
                        self.sweep_once().await;
                    }
                }
            }
        })
    }

    /// One pass: fail every outbound message pending past the threshold.
    /// Returns how many messages were reconciled.
    pub async fn sweep_once(&self) -> usize {
        let threshold =
            (Utc::now() - TimeDelta::seconds(self.config.pending_stale_secs as i64)).to_rfc3339();

        let stale = match self.store.stale_pending_messages(&threshold).await {
            Ok(stale) => stale,
            Err(e) => {
                warn!(error = %e, "stale-pending scan failed");
                return 0;
            }
        };

        let mut reconciled = 0;
        for message in stale {
            match self
                .store
                .advance_message_status(&message.id, MessageStatus::Failed, Some(REASON_STALE))
                .await
            {
                Ok(true) => {
                    reconciled += 1;
                    self.fanout.publish(
                        &message.account_id,
                        FanoutEvent::MessageStatus {
                            account_id: message.account_id.clone(),
                            message_id: message.id.clone(),
                            status: MessageStatus::Failed,
                            reason: Some(REASON_STALE.to_string()),
                        },
                    );
                }
                Ok(false) => {
                    // Lost the race to a late ack; the message is in a
                    // terminal (or `sent`) state now, which is fine.
                }
                Err(e) => {
                    warn!(message_id = %message.id, error = %e, "failed to reconcile message");
                }
            }
        }

        if reconciled > 0 {
            info!(count = reconciled, "reconciled stale pending messages");
        }
        reconciled
    }
}
