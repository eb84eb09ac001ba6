// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Tether relay: account and message entities,
//! lifecycle status enums, the target descriptor, and transport/fanout event
//! shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::TetherError;

/// Identifier assigned to a message by the channel provider once the wire
/// send is acknowledged. Unique per channel; the dedup key for inbound events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelMessageId(pub String);

/// The kind of messaging channel an account is provisioned on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// WhatsApp-style account paired out-of-band via QR code.
    Whatsapp,
    /// E-commerce chat channel (token-authenticated, no pairing step).
    Commerce,
}

/// Connection lifecycle status of an account.
///
/// `QrPending -> Connecting -> Connected -> Disconnected` with automatic
/// reconnection back to `Connecting`, or `Terminated` on explicit logout /
/// deletion. `Failed` is the terminal status for a transport that could not
/// be constructed at all.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    QrPending,
    Connecting,
    Connected,
    Disconnected,
    Terminated,
    Failed,
}

/// Direction of a message relative to the account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Delivery status of an outbound message.
///
/// Legal transitions: `Pending -> Sent -> Delivered -> Read`, and
/// `Pending | Sent -> Failed`. Receipts never regress an already-advanced
/// status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Whether a transition from `self` to `next` is legal.
    pub fn can_advance_to(self, next: MessageStatus) -> bool {
        use MessageStatus::*;
        matches!(
            (self, next),
            (Pending, Sent)
                | (Pending, Failed)
                | (Sent, Delivered)
                | (Sent, Read)
                | (Sent, Failed)
                | (Delivered, Read)
        )
    }

    /// Statuses that may legally precede `self` (used for guarded updates).
    pub fn legal_predecessors(self) -> &'static [MessageStatus] {
        use MessageStatus::*;
        match self {
            Pending => &[],
            Sent => &[Pending],
            Delivered => &[Sent],
            Read => &[Sent, Delivered],
            Failed => &[Pending, Sent],
        }
    }
}

/// Whether an inbound event arrived through the live stream or a history
/// backfill. History events are stored but never bump unread counters or
/// publish fanout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPath {
    Live,
    History,
}

/// Whether a send target is a 1:1 contact or a group context.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Contact,
    Group,
}

/// Tagged descriptor for a send/receive peer: contact or group, plus the
/// channel it lives on. Consumed polymorphically by the governor and the
/// dispatcher instead of string-suffix inspection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub channel: ChannelKind,
    pub kind: TargetKind,
    /// Channel-scoped external identifier of the peer.
    pub id: String,
}

impl TargetDescriptor {
    pub fn contact(channel: ChannelKind, id: impl Into<String>) -> Self {
        Self {
            channel,
            kind: TargetKind::Contact,
            id: id.into(),
        }
    }

    pub fn group(channel: ChannelKind, id: impl Into<String>) -> Self {
        Self {
            channel,
            kind: TargetKind::Group,
            id: id.into(),
        }
    }

    /// Stable cache key within one account's rate state.
    pub fn cache_key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

/// Message body content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { body: String },
    Media { mime: String, url: String, caption: Option<String> },
}

impl MessageContent {
    pub fn text(body: impl Into<String>) -> Self {
        MessageContent::Text { body: body.into() }
    }

    /// Storage column discriminant for the content variant.
    pub fn kind(&self) -> &'static str {
        match self {
            MessageContent::Text { .. } => "text",
            MessageContent::Media { .. } => "media",
        }
    }
}

/// One messaging identity connected to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub channel: ChannelKind,
    pub status: AccountStatus,
    /// Resolved identity attribute (phone number / shop id), assigned when
    /// the transport first opens.
    pub handle: Option<String>,
    /// Suppresses unread counting and read-receipt propagation. Storage
    /// still occurs.
    pub incognito: bool,
    /// Opaque transport credential blob; cleared on unrecoverable close.
    pub session_blob: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Minimal account view needed by the rate governor: identity plus the
/// creation instant used for warm-up tiering. Kept separate so the governor
/// never holds entity references across awaits.
#[derive(Debug, Clone)]
pub struct AccountProfile {
    pub id: String,
    pub created_at: DateTime<Utc>,
}

impl AccountProfile {
    /// Build a profile from a stored account, parsing its RFC3339 creation
    /// timestamp.
    pub fn from_account(account: &Account) -> Result<Self, TetherError> {
        let created_at = DateTime::parse_from_rfc3339(&account.created_at)
            .map_err(|e| {
                TetherError::Internal(format!(
                    "account {} has unparseable created_at `{}`: {e}",
                    account.id, account.created_at
                ))
            })?
            .with_timezone(&Utc);
        Ok(Self {
            id: account.id.clone(),
            created_at,
        })
    }
}

/// A contact known to one account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub account_id: String,
    /// Channel-scoped external identifier.
    pub external_id: String,
    pub display_name: Option<String>,
    pub created_at: String,
}

/// Groups messages for one contact or group context under one account.
/// Unique per (account, peer kind, peer id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub account_id: String,
    pub peer_kind: TargetKind,
    pub peer_id: String,
    pub unread_count: i64,
    pub last_activity_at: String,
    pub created_at: String,
}

/// A unit of conversation content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub account_id: String,
    pub direction: MessageDirection,
    pub content_type: String,
    pub body: String,
    /// Channel-assigned identifier; `None` until acknowledged by the
    /// transport. Unique when present.
    pub channel_message_id: Option<String>,
    pub status: MessageStatus,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A raw inbound event from the transport, before routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub channel_message_id: String,
    /// Conversation peer (the contact, or the group the message was posted in).
    pub target: TargetDescriptor,
    /// For group messages, the member who sent; equals `target.id` for 1:1.
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub content: MessageContent,
    pub timestamp: String,
    pub path: DeliveryPath,
}

/// Acknowledgment returned by the transport for a successful send.
#[derive(Debug, Clone)]
pub struct SendAck {
    pub channel_message_id: ChannelMessageId,
}

/// Events emitted by a connected channel transport.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// Out-of-band pairing data (QR payload). May recur before success.
    PairingData(String),
    /// The transport is open; carries the resolved identity attribute.
    Opened { handle: String },
    /// The transport closed. `recoverable` distinguishes a network/session
    /// drop (reconnect) from an explicit logout (terminal).
    Closed { recoverable: bool, detail: String },
    /// An inbound message, live or backfilled.
    Inbound(InboundEvent),
    /// Asynchronous delivery/read receipt for a previously sent message.
    DeliveryStatus {
        channel_message_id: String,
        status: MessageStatus,
    },
}

/// Events published to the per-account fanout topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FanoutEvent {
    /// Connection lifecycle change.
    AccountStatus {
        account_id: String,
        status: AccountStatus,
        handle: Option<String>,
    },
    /// Pairing data for out-of-band presentation.
    PairingCode { account_id: String, code: String },
    /// A newly stored live inbound message.
    MessageNew {
        account_id: String,
        conversation_id: String,
        message: Message,
    },
    /// An outbound message changed status.
    MessageStatus {
        account_id: String,
        message_id: String,
        status: MessageStatus,
        reason: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn message_status_transitions() {
        use MessageStatus::*;
        assert!(Pending.can_advance_to(Sent));
        assert!(Pending.can_advance_to(Failed));
        assert!(Sent.can_advance_to(Delivered));
        assert!(Sent.can_advance_to(Read));
        assert!(Delivered.can_advance_to(Read));

        // No regression, no resurrection.
        assert!(!Read.can_advance_to(Delivered));
        assert!(!Delivered.can_advance_to(Sent));
        assert!(!Failed.can_advance_to(Sent));
        assert!(!Delivered.can_advance_to(Failed));
        assert!(!Read.can_advance_to(Failed));
    }

    #[test]
    fn status_enums_round_trip_as_snake_case() {
        assert_eq!(AccountStatus::QrPending.to_string(), "qr_pending");
        assert_eq!(
            AccountStatus::from_str("qr_pending").unwrap(),
            AccountStatus::QrPending
        );
        assert_eq!(MessageStatus::Pending.to_string(), "pending");
        assert_eq!(
            MessageStatus::from_str("delivered").unwrap(),
            MessageStatus::Delivered
        );
        assert_eq!(ChannelKind::Whatsapp.to_string(), "whatsapp");
        assert_eq!(MessageDirection::Outbound.to_string(), "outbound");
    }

    #[test]
    fn target_descriptor_cache_key_distinguishes_kinds() {
        let c = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
        let g = TargetDescriptor::group(ChannelKind::Whatsapp, "551199");
        assert_ne!(c.cache_key(), g.cache_key());
        assert_eq!(c.cache_key(), "contact:551199");
    }

    #[test]
    fn account_profile_parses_rfc3339() {
        let account = Account {
            id: "acc-1".into(),
            channel: ChannelKind::Whatsapp,
            status: AccountStatus::Connecting,
            handle: None,
            incognito: false,
            session_blob: None,
            created_at: "2026-01-15T10:00:00+00:00".into(),
            updated_at: "2026-01-15T10:00:00+00:00".into(),
        };
        let profile = AccountProfile::from_account(&account).unwrap();
        assert_eq!(profile.id, "acc-1");
        assert_eq!(profile.created_at.to_rfc3339(), "2026-01-15T10:00:00+00:00");
    }

    #[test]
    fn account_profile_rejects_garbage_timestamp() {
        let account = Account {
            id: "acc-2".into(),
            channel: ChannelKind::Commerce,
            status: AccountStatus::Connecting,
            handle: None,
            incognito: false,
            session_blob: None,
            created_at: "yesterday".into(),
            updated_at: "yesterday".into(),
        };
        assert!(AccountProfile::from_account(&account).is_err());
    }

    #[test]
    fn fanout_event_serializes_tagged() {
        let ev = FanoutEvent::PairingCode {
            account_id: "acc-1".into(),
            code: "QR-DATA".into(),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["type"], "pairing_code");
        assert_eq!(json["code"], "QR-DATA");
    }
}
