// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime fanout trait. Topics are scoped by account; the relay core only
//! ever publishes, it never reads back from this channel.

use crate::types::FanoutEvent;

/// Publish-to-room contract consumed by the session, dispatcher, and router.
///
/// Publishing must never block the caller on subscriber delivery; slow or
/// absent subscribers are the publisher's non-problem.
pub trait FanoutPublisher: Send + Sync + 'static {
    fn publish(&self, account_id: &str, event: FanoutEvent);
}
