// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel transport trait: the external collaborator that encodes, decodes,
//! and transmits wire messages for a channel. The relay invokes it, never
//! reimplements it.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TetherError;
use crate::types::{Account, MessageContent, SendAck, TargetDescriptor, TransportEvent};

/// A live connection produced by [`ChannelTransport::connect`]: the send
/// handle plus the event stream the session loop drains.
pub struct TransportConnection {
    pub handle: Arc<dyn TransportHandle>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl std::fmt::Debug for TransportConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConnection").finish_non_exhaustive()
    }
}

/// Factory for per-account transport connections.
///
/// A construction failure (e.g. malformed stored credentials) must surface
/// as an error from `connect`; the session layer treats it as terminal and
/// never starts a retry loop from it.
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    async fn connect(&self, account: &Account) -> Result<TransportConnection, TetherError>;
}

/// Send side of an open transport connection.
#[async_trait]
pub trait TransportHandle: Send + Sync + 'static {
    /// Transmit a payload to the target. Returns the channel-assigned
    /// message id on acknowledgment.
    async fn send(
        &self,
        target: &TargetDescriptor,
        payload: &MessageContent,
    ) -> Result<SendAck, TetherError>;

    /// Release the connection without triggering reconnect semantics.
    async fn close(&self);
}
