// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process typed fanout bus with per-account topics.
//!
//! Implements the [`FanoutPublisher`] seam over tokio broadcast channels:
//! one channel per account topic, created lazily on first publish or
//! subscribe. Publishing never blocks and never fails — a topic with no
//! live subscribers simply drops the event, and a lagging subscriber loses
//! its oldest buffered events rather than backpressuring the relay core.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::trace;

use tether_core::types::FanoutEvent;
use tether_core::FanoutPublisher;

/// Envelope delivered to bus subscribers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BusEvent {
    /// Unique event id.
    pub id: String,
    /// RFC3339 publish timestamp.
    pub at: String,
    /// Topic scope.
    pub account_id: String,
    /// The payload.
    pub event: FanoutEvent,
}

/// Per-account broadcast topics.
pub struct EventBus {
    topics: RwLock<HashMap<String, broadcast::Sender<BusEvent>>>,
    capacity: usize,
}

impl EventBus {
    /// Default per-topic buffer: enough to absorb a burst of status events
    /// without lagging an attached inbox client.
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribe to one account's topic. Events published before the
    /// subscription are not replayed.
    pub fn subscribe(&self, account_id: &str) -> broadcast::Receiver<BusEvent> {
        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(account_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Number of live subscribers on an account topic.
    pub fn subscriber_count(&self, account_id: &str) -> usize {
        self.topics
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(account_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop a topic entirely (account deletion).
    pub fn remove_topic(&self, account_id: &str) {
        self.topics
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(account_id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl FanoutPublisher for EventBus {
    fn publish(&self, account_id: &str, event: FanoutEvent) {
        let envelope = BusEvent {
            id: uuid::Uuid::new_v4().to_string(),
            at: chrono::Utc::now().to_rfc3339(),
            account_id: account_id.to_string(),
            event,
        };

        let mut topics = self.topics.write().unwrap_or_else(|e| e.into_inner());
        let tx = topics
            .entry(account_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0);

        // A send error just means nobody is listening right now.
        if tx.send(envelope).is_err() {
            trace!(account_id, "fanout event dropped: no subscribers");
        }
    }
}
