// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the connection session state machine, driven by the
//! mock transport against a real SQLite store.

use std::sync::Arc;
use std::time::Duration;

use tether_bus::EventBus;
use tether_config::model::{SessionConfig, StorageConfig};
use tether_core::types::{Account, AccountStatus, ChannelKind, FanoutEvent, TransportEvent};
use tether_core::{FanoutPublisher, RelayStore};
use tether_session::SessionManager;
use tether_storage::SqliteStore;
use tether_test_utils::{fixtures, MockTransport};

struct Harness {
    transport: Arc<MockTransport>,
    store: Arc<SqliteStore>,
    bus: Arc<EventBus>,
    manager: Arc<SessionManager>,
    _dir: tempfile::TempDir,
}

async fn harness_with_backoff(backoff_secs: u64) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("session.db");
    let store = Arc::new(SqliteStore::new(StorageConfig {
        database_path: db_path.to_str().unwrap().to_string(),
        wal_mode: true,
    }));
    store.initialize().await.unwrap();

    let transport = Arc::new(MockTransport::new());
    let bus = Arc::new(EventBus::default());
    let config = SessionConfig {
        reconnect_backoff_secs: backoff_secs,
        ..SessionConfig::default()
    };
    let manager = Arc::new(SessionManager::new(
        transport.clone() as Arc<dyn tether_core::ChannelTransport>,
        store.clone() as Arc<dyn RelayStore>,
        bus.clone() as Arc<dyn FanoutPublisher>,
        config,
    ));
    Harness {
        transport,
        store,
        bus,
        manager,
        _dir: dir,
    }
}

async fn harness() -> Harness {
    harness_with_backoff(0).await
}

async fn create_account(h: &Harness, id: &str, channel: ChannelKind) -> Account {
    let account = fixtures::make_account(id, channel);
    h.store.create_account(&account).await.unwrap();
    account
}

async fn account_status(h: &Harness, id: &str) -> AccountStatus {
    h.store.get_account(id).await.unwrap().unwrap().status
}

/// Poll until the stored status matches, or panic after ~2s.
async fn wait_for_status(h: &Harness, id: &str, expected: AccountStatus) {
    for _ in 0..200 {
        if account_status(h, id).await == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "account {id} never reached {expected}, last was {}",
        account_status(h, id).await
    );
}

#[tokio::test]
async fn whatsapp_account_starts_in_qr_pending() {
    let h = harness().await;
    let account = create_account(&h, "acc-wa", ChannelKind::Whatsapp).await;

    h.manager.connect(account).await.unwrap();
    assert_eq!(account_status(&h, "acc-wa").await, AccountStatus::QrPending);
    assert!(h.manager.is_active("acc-wa"));
}

#[tokio::test]
async fn commerce_account_starts_in_connecting() {
    let h = harness().await;
    let account = create_account(&h, "acc-shop", ChannelKind::Commerce).await;

    h.manager.connect(account).await.unwrap();
    assert_eq!(account_status(&h, "acc-shop").await, AccountStatus::Connecting);
}

#[tokio::test]
async fn opened_event_persists_connected_with_handle() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.manager.connect(account).await.unwrap();

    h.transport
        .emit(TransportEvent::Opened {
            handle: "+5511999".to_string(),
        })
        .await;

    wait_for_status(&h, "acc-1", AccountStatus::Connected).await;
    let stored = h.store.get_account("acc-1").await.unwrap().unwrap();
    assert_eq!(stored.handle.as_deref(), Some("+5511999"));
}

#[tokio::test]
async fn pairing_data_is_published_for_out_of_band_presentation() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    let mut rx = h.bus.subscribe("acc-1");
    h.manager.connect(account).await.unwrap();

    h.transport
        .emit(TransportEvent::PairingData("QR-PAYLOAD-1".to_string()))
        .await;

    // Pairing may recur; the first PairingCode event carries the payload.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let event = tokio::time::timeout_at(deadline, rx.recv())
            .await
            .expect("timed out waiting for pairing event")
            .unwrap();
        if let FanoutEvent::PairingCode { code, .. } = event.event {
            assert_eq!(code, "QR-PAYLOAD-1");
            break;
        }
    }
}

#[tokio::test]
async fn recoverable_close_reconnects_after_backoff() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.manager.connect(account).await.unwrap();
    assert_eq!(h.transport.connect_count(), 1);

    h.transport
        .emit(TransportEvent::Closed {
            recoverable: true,
            detail: "stream error".to_string(),
        })
        .await;

    // Backoff is zero in this harness: a second connect must follow without
    // manual intervention.
    for _ in 0..200 {
        if h.transport.connect_count() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.transport.connect_count(), 2);

    // The fresh session re-enters the pairing flow.
    wait_for_status(&h, "acc-1", AccountStatus::QrPending).await;
}

#[tokio::test]
async fn unrecoverable_close_discards_artifacts_and_stays_down() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.manager.connect(account).await.unwrap();

    h.transport
        .emit(TransportEvent::Closed {
            recoverable: false,
            detail: "logged out".to_string(),
        })
        .await;

    wait_for_status(&h, "acc-1", AccountStatus::Disconnected).await;

    // Credentials are gone and no reconnect is attempted.
    for _ in 0..100 {
        if h.store
            .get_account("acc-1")
            .await
            .unwrap()
            .unwrap()
            .session_blob
            .is_none()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let stored = h.store.get_account("acc-1").await.unwrap().unwrap();
    assert!(stored.session_blob.is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.transport.connect_count(), 1);
    assert!(!h.manager.is_active("acc-1"));
    assert!(h.manager.sender("acc-1").is_none());
}

#[tokio::test]
async fn construction_failure_is_terminal_not_retried() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.transport.set_fail_connect(true);

    let result = h.manager.connect(account).await;
    assert!(result.is_err(), "connect should surface the transport error");
    assert_eq!(account_status(&h, "acc-1").await, AccountStatus::Failed);

    // No silent retry loop starts from a construction failure.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.transport.connect_count(), 0);
    assert!(!h.manager.is_active("acc-1"));
}

#[tokio::test]
async fn destroy_cancels_pending_reconnect() {
    let h = harness_with_backoff(1).await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.manager.connect(account).await.unwrap();

    h.transport
        .emit(TransportEvent::Closed {
            recoverable: true,
            detail: "stream error".to_string(),
        })
        .await;
    wait_for_status(&h, "acc-1", AccountStatus::Disconnected).await;

    // Destroy while the 1s reconnect timer is pending.
    h.manager.destroy("acc-1").await;
    assert_eq!(account_status(&h, "acc-1").await, AccountStatus::Terminated);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(h.transport.connect_count(), 1, "reconnect must not fire");
}

#[tokio::test]
async fn destroy_releases_transport_and_cancels_lifecycle() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Whatsapp).await;
    h.manager.connect(account).await.unwrap();
    let token = h.manager.lifecycle_token("acc-1");

    h.manager.destroy("acc-1").await;

    assert!(token.is_cancelled());
    assert!(!h.manager.is_active("acc-1"));
    for _ in 0..100 {
        if h.transport.close_count() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(h.transport.close_count() >= 1);
    assert_eq!(account_status(&h, "acc-1").await, AccountStatus::Terminated);
}

#[tokio::test]
async fn shutdown_persists_disconnected_for_resume() {
    let h = harness().await;
    let account = create_account(&h, "acc-1", ChannelKind::Commerce).await;
    h.manager.connect(account).await.unwrap();

    h.manager.shutdown().await;

    assert_eq!(account_status(&h, "acc-1").await, AccountStatus::Disconnected);
    assert!(!h.manager.is_active("acc-1"));
}
