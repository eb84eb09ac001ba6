// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter bridge: a [`tether_core::ChannelTransport`] implemented
//! over a per-account child process speaking one JSON object per line.
//!
//! The adapter process owns the actual wire protocol (framing, crypto,
//! session handshakes); the relay spawns it, drains its stdout as the
//! transport event stream, and writes send requests to its stdin.

pub mod protocol;
pub mod transport;

pub use protocol::{AdapterLine, RelayLine};
pub use transport::BridgeTransport;
