// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Line protocol between the relay and a channel adapter process.
//!
//! One JSON object per line in each direction. The adapter owns the wire
//! protocol (framing, crypto, session state); the relay only ever sees
//! these shapes.

use serde::{Deserialize, Serialize};

use tether_core::types::{InboundEvent, MessageContent, MessageStatus, TargetDescriptor};

/// Lines the adapter writes to stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdapterLine {
    /// Out-of-band pairing payload (QR data). May recur.
    PairingData { code: String },
    /// The adapter's wire session opened; carries the resolved identity.
    Opened { handle: String },
    /// The wire session closed. `recoverable = false` means logged out.
    Closed { recoverable: bool, detail: String },
    /// An inbound message, live or history backfill.
    Inbound(InboundEvent),
    /// Acknowledgment for a send request, matched by `id`.
    SendAck {
        id: String,
        #[serde(default)]
        channel_message_id: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    /// Asynchronous delivery/read receipt.
    DeliveryStatus {
        channel_message_id: String,
        status: MessageStatus,
    },
}

/// Lines the relay writes to the adapter's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RelayLine {
    /// Transmit a payload; the adapter must answer with a `send_ack`
    /// carrying the same `id`.
    Send {
        id: String,
        target: TargetDescriptor,
        payload: MessageContent,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::types::ChannelKind;

    #[test]
    fn adapter_lines_round_trip() {
        let line = r#"{"type":"opened","handle":"+5511999"}"#;
        let parsed: AdapterLine = serde_json::from_str(line).unwrap();
        assert!(matches!(parsed, AdapterLine::Opened { handle } if handle == "+5511999"));

        let line = r#"{"type":"closed","recoverable":false,"detail":"logged out"}"#;
        let parsed: AdapterLine = serde_json::from_str(line).unwrap();
        assert!(matches!(parsed, AdapterLine::Closed { recoverable: false, .. }));

        let line = r#"{"type":"send_ack","id":"req-1","channel_message_id":"wire-9"}"#;
        let parsed: AdapterLine = serde_json::from_str(line).unwrap();
        match parsed {
            AdapterLine::SendAck {
                id,
                channel_message_id,
                error,
            } => {
                assert_eq!(id, "req-1");
                assert_eq!(channel_message_id.as_deref(), Some("wire-9"));
                assert!(error.is_none());
            }
            other => panic!("expected send_ack, got {other:?}"),
        }
    }

    #[test]
    fn send_request_serializes_with_op_tag() {
        let request = RelayLine::Send {
            id: "req-1".to_string(),
            target: TargetDescriptor::contact(ChannelKind::Whatsapp, "551199"),
            payload: MessageContent::text("hello"),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["op"], "send");
        assert_eq!(json["id"], "req-1");
        assert_eq!(json["target"]["id"], "551199");
    }

    #[test]
    fn inbound_line_carries_delivery_path() {
        let line = r#"{"type":"inbound","channel_message_id":"wire-1",
            "target":{"channel":"whatsapp","kind":"contact","id":"551188"},
            "sender_id":"551188","sender_name":null,
            "content":{"type":"text","body":"oi"},
            "timestamp":"2026-01-01T00:00:00Z","path":"history"}"#;
        let parsed: AdapterLine = serde_json::from_str(line).unwrap();
        match parsed {
            AdapterLine::Inbound(event) => {
                assert_eq!(event.channel_message_id, "wire-1");
                assert_eq!(event.path, tether_core::types::DeliveryPath::History);
            }
            other => panic!("expected inbound, got {other:?}"),
        }
    }
}
