// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-message-id idempotency cache bridging the live and history inbound
//! paths.
//!
//! The in-memory cache is purely a fast path. The persistent
//! unique-constraint on the channel message id (surfaced as
//! `InsertOutcome::Duplicate`) is the source of truth: two racing
//! deliveries that both miss the cache still collapse to one stored row,
//! because only one insert succeeds.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use tether_core::{RelayStore, TetherError};

/// Bounded seen-id cache with oldest-eviction.
struct SeenCache {
    order: VecDeque<String>,
    set: HashSet<String>,
    cap: usize,
}

impl SeenCache {
    fn insert(&mut self, id: &str) {
        if self.set.insert(id.to_string()) {
            self.order.push_back(id.to_string());
            while self.order.len() > self.cap {
                if let Some(evicted) = self.order.pop_front() {
                    self.set.remove(&evicted);
                }
            }
        }
    }
}

/// Idempotency check for inbound channel message ids.
pub struct Deduplicator {
    store: Arc<dyn RelayStore>,
    seen: Mutex<SeenCache>,
}

impl Deduplicator {
    /// Default seen-cache bound.
    pub const DEFAULT_CACHE_SIZE: usize = 4096;

    pub fn new(store: Arc<dyn RelayStore>, cache_size: usize) -> Self {
        Self {
            store,
            seen: Mutex::new(SeenCache {
                order: VecDeque::new(),
                set: HashSet::new(),
                cap: cache_size.max(1),
            }),
        }
    }

    /// Has this channel message id been seen before?
    ///
    /// Memory first; on a miss, the persistent store. A positive persistent
    /// answer populates the cache so the next probe is free.
    pub async fn is_duplicate(&self, channel_message_id: &str) -> Result<bool, TetherError> {
        {
            let seen = self.seen.lock().await;
            if seen.set.contains(channel_message_id) {
                return Ok(true);
            }
        }

        let exists = self.store.channel_message_exists(channel_message_id).await?;
        if exists {
            debug!(channel_message_id, "dedup cache warmed from store");
            self.seen.lock().await.insert(channel_message_id);
        }
        Ok(exists)
    }

    /// Record a freshly persisted id. Called immediately after the first
    /// successful insert, before any further processing of the message.
    pub async fn mark_seen(&self, channel_message_id: &str) {
        self.seen.lock().await.insert(channel_message_id);
    }
}
