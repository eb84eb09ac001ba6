// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `ChannelTransport` over a spawned adapter process.
//!
//! One adapter process per account, invoked as
//! `<command> [args..] <account_id> <channel_kind>`. The adapter's stdout
//! becomes the transport event stream; sends go to its stdin and are matched
//! to acknowledgments by request id. Killing the process is the close
//! operation — the adapter owns all wire-session state beyond the stored
//! credential blob.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, warn};

use tether_config::model::BridgeConfig;
use tether_core::types::{
    Account, ChannelMessageId, MessageContent, SendAck, TargetDescriptor, TransportEvent,
};
use tether_core::{ChannelTransport, TetherError, TransportConnection, TransportHandle};

use crate::protocol::{AdapterLine, RelayLine};

/// Spawns one adapter process per account connection.
pub struct BridgeTransport {
    config: BridgeConfig,
}

impl BridgeTransport {
    pub fn new(config: BridgeConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChannelTransport for BridgeTransport {
    async fn connect(&self, account: &Account) -> Result<TransportConnection, TetherError> {
        let Some(command) = self.config.command.as_deref() else {
            return Err(TetherError::transport(
                "no channel adapter configured: set [bridge] command",
            ));
        };

        let mut child = Command::new(command)
            .args(&self.config.args)
            .arg(&account.id)
            .arg(account.channel.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TetherError::Transport {
                message: format!("failed to spawn channel adapter `{command}`"),
                source: Some(Box::new(e)),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TetherError::transport("adapter process has no stdin")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TetherError::transport("adapter process has no stdout")
        })?;

        let (events_tx, events_rx) = mpsc::channel(256);
        let pending: Arc<Mutex<HashMap<String, oneshot::Sender<AdapterLine>>>> =
            Arc::new(Mutex::new(HashMap::new()));

        // Reader task: adapter stdout -> transport events / ack matching.
        let reader_pending = Arc::clone(&pending);
        let account_id = account.id.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<AdapterLine>(line) {
                            Ok(AdapterLine::SendAck { id, channel_message_id, error }) => {
                                let waiter = reader_pending.lock().await.remove(&id);
                                match waiter {
                                    Some(tx) => {
                                        let _ = tx.send(AdapterLine::SendAck {
                                            id,
                                            channel_message_id,
                                            error,
                                        });
                                    }
                                    None => {
                                        debug!(account_id = %account_id, request_id = %id, "unmatched send ack");
                                    }
                                }
                            }
                            Ok(line) => {
                                if let Some(event) = adapter_line_to_event(line)
                                    && events_tx.send(event).await.is_err()
                                {
                                    // Session loop is gone.
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(account_id = %account_id, error = %e, "unparseable adapter line");
                            }
                        }
                    }
                    // EOF or read error: the adapter died. The session layer
                    // treats a closed event stream as a recoverable drop.
                    Ok(None) => break,
                    Err(e) => {
                        warn!(account_id = %account_id, error = %e, "adapter stdout read failed");
                        break;
                    }
                }
            }
            debug!(account_id = %account_id, "adapter stream ended");
        });

        let handle = Arc::new(BridgeHandle {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            send_timeout: Duration::from_secs(self.config.send_timeout_secs),
        });

        Ok(TransportConnection {
            handle,
            events: events_rx,
        })
    }
}

fn adapter_line_to_event(line: AdapterLine) -> Option<TransportEvent> {
    match line {
        AdapterLine::PairingData { code } => Some(TransportEvent::PairingData(code)),
        AdapterLine::Opened { handle } => Some(TransportEvent::Opened { handle }),
        AdapterLine::Closed { recoverable, detail } => {
            Some(TransportEvent::Closed { recoverable, detail })
        }
        AdapterLine::Inbound(event) => Some(TransportEvent::Inbound(event)),
        AdapterLine::DeliveryStatus { channel_message_id, status } => {
            Some(TransportEvent::DeliveryStatus { channel_message_id, status })
        }
        // Acks are matched in the reader and never reach here.
        AdapterLine::SendAck { .. } => None,
    }
}

/// Send side of one adapter process.
struct BridgeHandle {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<AdapterLine>>>>,
    send_timeout: Duration,
}

#[async_trait]
impl TransportHandle for BridgeHandle {
    async fn send(
        &self,
        target: &TargetDescriptor,
        payload: &MessageContent,
    ) -> Result<SendAck, TetherError> {
        let id = uuid::Uuid::new_v4().to_string();
        let request = RelayLine::Send {
            id: id.clone(),
            target: target.clone(),
            payload: payload.clone(),
        };
        let mut line = serde_json::to_string(&request).map_err(|e| TetherError::Transport {
            message: "failed to encode send request".to_string(),
            source: Some(Box::new(e)),
        })?;
        line.push('\n');

        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), ack_tx);

        {
            let mut stdin = self.stdin.lock().await;
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(TetherError::Transport {
                    message: "failed to write to channel adapter".to_string(),
                    source: Some(Box::new(e)),
                });
            }
            if let Err(e) = stdin.flush().await {
                self.pending.lock().await.remove(&id);
                return Err(TetherError::Transport {
                    message: "failed to flush channel adapter stdin".to_string(),
                    source: Some(Box::new(e)),
                });
            }
        }

        // The adapter's timeout is ours: an unacknowledged send becomes a
        // failed message, never a forever-pending one.
        let ack = match tokio::time::timeout(self.send_timeout, ack_rx).await {
            Ok(Ok(ack)) => ack,
            Ok(Err(_)) => {
                return Err(TetherError::transport("adapter dropped the send request"));
            }
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(TetherError::Timeout {
                    duration: self.send_timeout,
                });
            }
        };

        match ack {
            AdapterLine::SendAck {
                channel_message_id: Some(channel_message_id),
                error: None,
                ..
            } => Ok(SendAck {
                channel_message_id: ChannelMessageId(channel_message_id),
            }),
            AdapterLine::SendAck { error: Some(error), .. } => {
                Err(TetherError::transport(error))
            }
            _ => Err(TetherError::transport("malformed send acknowledgment")),
        }
    }

    async fn close(&self) {
        let mut child = self.child.lock().await;
        if let Err(e) = child.kill().await {
            debug!(error = %e, "adapter process already gone");
        }
    }
}
