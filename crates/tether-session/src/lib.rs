// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connection session lifecycle for the Tether relay.
//!
//! One event-loop task per account wraps the external channel transport,
//! persists every status transition, forwards inbound traffic to the
//! pipeline sinks, and reconnects automatically after recoverable closes.

pub mod manager;

pub use manager::SessionManager;
