// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits consumed by the relay core.

pub mod fanout;
pub mod sink;
pub mod store;
pub mod transport;

pub use fanout::FanoutPublisher;
pub use sink::{InboundSink, StatusSink};
pub use store::{InsertOutcome, RelayStore};
pub use transport::{ChannelTransport, TransportConnection, TransportHandle};
