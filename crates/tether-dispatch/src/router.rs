// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event routing.
//!
//! Normalizes every raw inbound event into stored entities: resolve/create
//! the contact, resolve the unique conversation, dedup, persist, then — for
//! live events only — bump unread/activity and publish the new-message
//! fanout. History backfill is stored silently.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use tether_core::types::{
    Account, DeliveryPath, FanoutEvent, InboundEvent, Message, MessageContent,
    MessageDirection, MessageStatus,
};
use tether_core::{FanoutPublisher, InboundSink, InsertOutcome, RelayStore, TetherError};

use crate::dedup::Deduplicator;

/// Routes inbound events from connection sessions into storage and fanout.
pub struct InboundRouter {
    store: Arc<dyn RelayStore>,
    fanout: Arc<dyn FanoutPublisher>,
    dedup: Arc<Deduplicator>,
}

impl InboundRouter {
    pub fn new(
        store: Arc<dyn RelayStore>,
        fanout: Arc<dyn FanoutPublisher>,
        dedup: Arc<Deduplicator>,
    ) -> Self {
        Self { store, fanout, dedup }
    }

    async fn route(&self, account: &Account, event: InboundEvent) -> Result<(), TetherError> {
        if self.dedup.is_duplicate(&event.channel_message_id).await? {
            debug!(
                account_id = %account.id,
                channel_message_id = %event.channel_message_id,
                "duplicate inbound dropped by cache"
            );
            return Ok(());
        }

        // The sender contact always exists after this; for group messages
        // it is the posting member, for 1:1 it is the peer itself.
        self.store
            .get_or_create_contact(&account.id, &event.sender_id, event.sender_name.as_deref())
            .await?;

        let conversation = self
            .store
            .get_or_create_conversation(&account.id, &event.target)
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            account_id: account.id.clone(),
            direction: MessageDirection::Inbound,
            content_type: event.content.kind().to_string(),
            body: body_text(&event.content),
            channel_message_id: Some(event.channel_message_id.clone()),
            status: MessageStatus::Delivered,
            failure_reason: None,
            created_at: event.timestamp.clone(),
            updated_at: now.clone(),
        };

        // The unique constraint, not the cache, decides: a live/history race
        // that slipped past the cache collapses here.
        match self.store.insert_message_if_absent(&message).await? {
            InsertOutcome::Duplicate => {
                self.dedup.mark_seen(&event.channel_message_id).await;
                debug!(
                    account_id = %account.id,
                    channel_message_id = %event.channel_message_id,
                    "duplicate inbound dropped by unique constraint"
                );
                return Ok(());
            }
            InsertOutcome::Inserted => {
                // Seen must be visible before any further processing so a
                // concurrent redelivery cannot also pass the check.
                self.dedup.mark_seen(&event.channel_message_id).await;
            }
        }

        if event.path == DeliveryPath::History {
            // Backfill: stored, but no unread bump and no fanout.
            return Ok(());
        }

        self.store
            .bump_conversation(&conversation.id, &now, !account.incognito)
            .await?;

        self.fanout.publish(
            &account.id,
            FanoutEvent::MessageNew {
                account_id: account.id.clone(),
                conversation_id: conversation.id.clone(),
                message,
            },
        );
        Ok(())
    }
}

fn body_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text { body } => body.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[async_trait]
impl InboundSink for InboundRouter {
    async fn handle_inbound(&self, account: &Account, event: InboundEvent) {
        let channel_message_id = event.channel_message_id.clone();
        if let Err(e) = self.route(account, event).await {
            // Propagation policy: inbound failures never bubble into the
            // session loop; the event is lost to this delivery and a
            // redelivery (or history backfill) gets another chance.
            warn!(
                account_id = %account.id,
                channel_message_id = %channel_message_id,
                error = %e,
                "inbound routing failed"
            );
        }
    }
}
