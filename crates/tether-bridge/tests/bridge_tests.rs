// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the adapter bridge, driven by shell-script adapters.

#![cfg(unix)]

use std::time::Duration;

use tether_bridge::BridgeTransport;
use tether_config::model::BridgeConfig;
use tether_core::types::{
    Account, AccountStatus, ChannelKind, MessageContent, TargetDescriptor, TransportEvent,
};
use tether_core::ChannelTransport;

fn make_account(id: &str) -> Account {
    let now = chrono_like_now();
    Account {
        id: id.to_string(),
        channel: ChannelKind::Whatsapp,
        status: AccountStatus::Connecting,
        handle: None,
        incognito: false,
        session_blob: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

fn chrono_like_now() -> String {
    "2026-01-01T00:00:00.000Z".to_string()
}

/// Write a shell script adapter and return a config invoking it via sh.
fn script_config(dir: &tempfile::TempDir, body: &str) -> BridgeConfig {
    let path = dir.path().join("adapter.sh");
    std::fs::write(&path, body).unwrap();
    BridgeConfig {
        command: Some("/bin/sh".to_string()),
        args: vec![path.to_str().unwrap().to_string()],
        send_timeout_secs: 5,
    }
}

#[tokio::test]
async fn adapter_events_become_transport_events() {
    let dir = tempfile::tempdir().unwrap();
    let config = script_config(
        &dir,
        r#"
echo '{"type":"pairing_data","code":"QR-1"}'
echo '{"type":"opened","handle":"+5511999"}'
sleep 5
"#,
    );
    let transport = BridgeTransport::new(config);
    let mut connection = transport.connect(&make_account("acc-1")).await.unwrap();

    match connection.events.recv().await {
        Some(TransportEvent::PairingData(code)) => assert_eq!(code, "QR-1"),
        other => panic!("expected pairing data, got {other:?}"),
    }
    match connection.events.recv().await {
        Some(TransportEvent::Opened { handle }) => assert_eq!(handle, "+5511999"),
        other => panic!("expected opened, got {other:?}"),
    }
    connection.handle.close().await;
}

#[tokio::test]
async fn send_is_matched_to_its_acknowledgment() {
    let dir = tempfile::tempdir().unwrap();
    // Echo a send_ack for every request, extracting the request id.
    let config = script_config(
        &dir,
        r#"
while read line; do
  id=$(printf '%s' "$line" | sed -n 's/^{"op":"send","id":"\([^"]*\)".*/\1/p')
  printf '{"type":"send_ack","id":"%s","channel_message_id":"wire-%s"}\n' "$id" "$id"
done
"#,
    );
    let transport = BridgeTransport::new(config);
    let connection = transport.connect(&make_account("acc-1")).await.unwrap();

    let target = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
    let ack = connection
        .handle
        .send(&target, &MessageContent::text("hello"))
        .await
        .unwrap();
    assert!(ack.channel_message_id.0.starts_with("wire-"));
    connection.handle.close().await;
}

#[tokio::test]
async fn ack_error_fails_the_send() {
    let dir = tempfile::tempdir().unwrap();
    let config = script_config(
        &dir,
        r#"
while read line; do
  id=$(printf '%s' "$line" | sed -n 's/^{"op":"send","id":"\([^"]*\)".*/\1/p')
  printf '{"type":"send_ack","id":"%s","error":"not on this channel"}\n' "$id"
done
"#,
    );
    let transport = BridgeTransport::new(config);
    let connection = transport.connect(&make_account("acc-1")).await.unwrap();

    let target = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
    let err = connection
        .handle
        .send(&target, &MessageContent::text("hello"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not on this channel"));
    connection.handle.close().await;
}

#[tokio::test]
async fn silent_adapter_times_out_the_send() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = script_config(&dir, "sleep 30\n");
    config.send_timeout_secs = 1;
    let transport = BridgeTransport::new(config);
    let connection = transport.connect(&make_account("acc-1")).await.unwrap();

    let target = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
    let started = std::time::Instant::now();
    let err = connection
        .handle
        .send(&target, &MessageContent::text("hello"))
        .await
        .unwrap_err();
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert!(err.to_string().contains("timed out"));
    connection.handle.close().await;
}

#[tokio::test]
async fn adapter_exit_ends_the_event_stream() {
    let dir = tempfile::tempdir().unwrap();
    let config = script_config(&dir, "exit 0\n");
    let transport = BridgeTransport::new(config);
    let mut connection = transport.connect(&make_account("acc-1")).await.unwrap();

    // EOF closes the stream; the session layer maps this to a recoverable
    // drop.
    let next = tokio::time::timeout(Duration::from_secs(5), connection.events.recv())
        .await
        .expect("stream should end promptly");
    assert!(next.is_none());
}

#[tokio::test]
async fn missing_command_refuses_to_connect() {
    let transport = BridgeTransport::new(BridgeConfig::default());
    let err = transport.connect(&make_account("acc-1")).await.unwrap_err();
    assert!(err.to_string().contains("no channel adapter configured"));
}
