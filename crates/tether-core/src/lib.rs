// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tether relay.
//!
//! This crate provides the foundational error type, domain types, and
//! collaborator traits used throughout the Tether workspace: the channel
//! transport seam, the persistence contract, the fanout publisher, and the
//! session-to-pipeline sinks.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TetherError;
pub use types::{
    Account, AccountProfile, AccountStatus, ChannelKind, ChannelMessageId, Contact,
    Conversation, DeliveryPath, FanoutEvent, InboundEvent, Message, MessageContent,
    MessageDirection, MessageStatus, SendAck, TargetDescriptor, TargetKind, TransportEvent,
};

pub use traits::{
    ChannelTransport, FanoutPublisher, InboundSink, InsertOutcome, RelayStore, StatusSink,
    TransportConnection, TransportHandle,
};
