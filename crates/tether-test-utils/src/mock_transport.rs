// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel transport for deterministic testing.
//!
//! `MockTransport` implements `ChannelTransport` with test-driven event
//! emission and captured outbound sends. Each `connect()` hands out a fresh
//! event channel; `emit()` feeds events into the most recent connection,
//! which is what a reconnect-following test wants.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use tether_core::types::{
    Account, ChannelMessageId, MessageContent, SendAck, TargetDescriptor, TransportEvent,
};
use tether_core::{ChannelTransport, TetherError, TransportConnection, TransportHandle};

/// Shared state between the transport factory and its handles.
#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<(TargetDescriptor, MessageContent)>>,
    fail_send_with: Mutex<Option<String>>,
    ack_counter: AtomicUsize,
    close_count: AtomicUsize,
}

/// A mock transport for testing session and dispatch behavior.
pub struct MockTransport {
    shared: Arc<Shared>,
    connect_count: AtomicUsize,
    fail_connect: AtomicBool,
    event_txs: Mutex<Vec<mpsc::Sender<TransportEvent>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            connect_count: AtomicUsize::new(0),
            fail_connect: AtomicBool::new(false),
            event_txs: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent `connect()` calls fail (malformed credentials).
    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `send()` calls fail with the given message.
    pub async fn set_fail_send(&self, reason: Option<&str>) {
        *self.shared.fail_send_with.lock().await = reason.map(|r| r.to_string());
    }

    /// Emit a transport event into the most recent connection.
    pub async fn emit(&self, event: TransportEvent) {
        let txs = self.event_txs.lock().await;
        if let Some(tx) = txs.last() {
            let _ = tx.send(event).await;
        }
    }

    /// How many times `connect()` succeeded.
    pub fn connect_count(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// How many handles were closed.
    pub fn close_count(&self) -> usize {
        self.shared.close_count.load(Ordering::SeqCst)
    }

    /// All payloads passed to `send()`.
    pub async fn sent_messages(&self) -> Vec<(TargetDescriptor, MessageContent)> {
        self.shared.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.shared.sent.lock().await.len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChannelTransport for MockTransport {
    async fn connect(&self, _account: &Account) -> Result<TransportConnection, TetherError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(TetherError::transport("stored credentials are malformed"));
        }

        self.connect_count.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        self.event_txs.lock().await.push(tx);

        let handle = Arc::new(MockHandle {
            shared: Arc::clone(&self.shared),
        });
        Ok(TransportConnection { handle, events: rx })
    }
}

struct MockHandle {
    shared: Arc<Shared>,
}

#[async_trait]
impl TransportHandle for MockHandle {
    async fn send(
        &self,
        target: &TargetDescriptor,
        payload: &MessageContent,
    ) -> Result<SendAck, TetherError> {
        if let Some(reason) = self.shared.fail_send_with.lock().await.clone() {
            return Err(TetherError::transport(reason));
        }
        self.shared
            .sent
            .lock()
            .await
            .push((target.clone(), payload.clone()));
        let n = self.shared.ack_counter.fetch_add(1, Ordering::SeqCst);
        Ok(SendAck {
            channel_message_id: ChannelMessageId(format!("wire-{n}")),
        })
    }

    async fn close(&self) {
        self.shared.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use tether_core::types::ChannelKind;

    #[tokio::test]
    async fn connect_send_and_ack() {
        let transport = MockTransport::new();
        let account = fixtures::make_account("acc-1", ChannelKind::Whatsapp);
        let conn = transport.connect(&account).await.unwrap();

        let target = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
        let ack = conn
            .handle
            .send(&target, &MessageContent::text("hello"))
            .await
            .unwrap();
        assert_eq!(ack.channel_message_id.0, "wire-0");
        assert_eq!(transport.sent_count().await, 1);
    }

    #[tokio::test]
    async fn emitted_events_arrive_on_latest_connection() {
        let transport = MockTransport::new();
        let account = fixtures::make_account("acc-1", ChannelKind::Whatsapp);

        let _first = transport.connect(&account).await.unwrap();
        let mut second = transport.connect(&account).await.unwrap();
        assert_eq!(transport.connect_count(), 2);

        transport
            .emit(TransportEvent::Opened {
                handle: "+5511999".to_string(),
            })
            .await;

        match second.events.recv().await {
            Some(TransportEvent::Opened { handle }) => assert_eq!(handle, "+5511999"),
            other => panic!("expected Opened on latest connection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failing_connect_surfaces_error() {
        let transport = MockTransport::new();
        transport.set_fail_connect(true);
        let account = fixtures::make_account("acc-1", ChannelKind::Whatsapp);
        assert!(transport.connect(&account).await.is_err());
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn failing_send_surfaces_error() {
        let transport = MockTransport::new();
        let account = fixtures::make_account("acc-1", ChannelKind::Whatsapp);
        let conn = transport.connect(&account).await.unwrap();
        transport.set_fail_send(Some("socket reset")).await;

        let target = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
        let err = conn
            .handle
            .send(&target, &MessageContent::text("hello"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("socket reset"));
        assert_eq!(transport.sent_count().await, 0);
    }
}
