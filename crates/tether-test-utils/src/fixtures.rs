// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared entity fixtures for crate tests.

use tether_core::types::{
    Account, AccountStatus, ChannelKind, DeliveryPath, InboundEvent, MessageContent,
    TargetDescriptor,
};

/// An account created "now", in `connecting`, with a credential blob.
pub fn make_account(id: &str, channel: ChannelKind) -> Account {
    let now = chrono::Utc::now().to_rfc3339();
    Account {
        id: id.to_string(),
        channel,
        status: AccountStatus::Connecting,
        handle: None,
        incognito: false,
        session_blob: Some("creds".to_string()),
        created_at: now.clone(),
        updated_at: now,
    }
}

/// An account with a creation timestamp `age_days` in the past.
pub fn make_account_aged(id: &str, channel: ChannelKind, age_days: i64) -> Account {
    let mut account = make_account(id, channel);
    account.created_at = (chrono::Utc::now() - chrono::TimeDelta::days(age_days)).to_rfc3339();
    account
}

/// A live inbound text message from a 1:1 contact.
pub fn make_inbound(channel_message_id: &str, sender: &str, body: &str) -> InboundEvent {
    InboundEvent {
        channel_message_id: channel_message_id.to_string(),
        target: TargetDescriptor::contact(ChannelKind::Whatsapp, sender),
        sender_id: sender.to_string(),
        sender_name: None,
        content: MessageContent::text(body),
        timestamp: chrono::Utc::now().to_rfc3339(),
        path: DeliveryPath::Live,
    }
}

/// A history-backfill variant of [`make_inbound`].
pub fn make_history(channel_message_id: &str, sender: &str, body: &str) -> InboundEvent {
    InboundEvent {
        path: DeliveryPath::History,
        ..make_inbound(channel_message_id, sender, body)
    }
}
