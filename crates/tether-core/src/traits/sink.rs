// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Forwarding seams from the session event loop toward the inbound router
//! and the dispatcher's status handler.
//!
//! Sink implementations handle their own failures (log + message status),
//! never propagating errors back into the session loop: by the time an event
//! reaches a sink, the loop's only job is to keep draining the transport.

use async_trait::async_trait;

use crate::types::{Account, InboundEvent, MessageStatus};

/// Receives normalized inbound message/history events from a session.
#[async_trait]
pub trait InboundSink: Send + Sync + 'static {
    async fn handle_inbound(&self, account: &Account, event: InboundEvent);
}

/// Receives asynchronous delivery/read receipts from a session.
#[async_trait]
pub trait StatusSink: Send + Sync + 'static {
    async fn handle_delivery_status(
        &self,
        account: &Account,
        channel_message_id: &str,
        status: MessageStatus,
    );
}
