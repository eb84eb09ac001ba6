// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound message dispatch.
//!
//! `dispatch()` persists a `pending` row synchronously and returns it — the
//! caller gets an immediate response and learns the outcome over fanout.
//! A spawned sender task then sleeps through governor denials, sends via
//! the account's session handle, and drives the row to `sent` or `failed`.
//!
//! Per-account ordering: one async mutex per account serializes its sender
//! tasks, so the governor's counters see no intra-account races and rows
//! complete in admission order within an account. Across accounts there is
//! full concurrency. Terminal statuses may still complete out of call order
//! across conversations (reply traffic admits fast, broadcast traffic waits
//! longer) — that asymmetry is intended.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tether_core::types::{
    Account, AccountProfile, FanoutEvent, Message, MessageContent, MessageDirection,
    MessageStatus, TargetDescriptor,
};
use tether_core::{FanoutPublisher, RelayStore, StatusSink, TetherError};
use tether_rate::{AdmitDecision, RateGovernor};
use tether_session::SessionManager;

/// Failure reason recorded when the daily new-contact cap denies a send.
pub const REASON_DAILY_LIMIT: &str = "daily limit reached";
/// Failure reason recorded when the owning session is gone.
pub const REASON_SESSION_GONE: &str = "session terminated";
/// Failure reason recorded when no transport connection is open.
pub const REASON_NO_SESSION: &str = "no active session";

/// Orchestrates one outbound send from optimistic write to terminal status.
pub struct MessageDispatcher {
    store: Arc<dyn RelayStore>,
    fanout: Arc<dyn FanoutPublisher>,
    governor: Arc<RateGovernor>,
    sessions: Arc<SessionManager>,
    /// Per-account send serialization.
    send_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MessageDispatcher {
    pub fn new(
        store: Arc<dyn RelayStore>,
        fanout: Arc<dyn FanoutPublisher>,
        governor: Arc<RateGovernor>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            store,
            fanout,
            governor,
            sessions,
            send_locks: DashMap::new(),
        }
    }

    /// Persist a `pending` record and kick off the asynchronous send.
    ///
    /// Returns the pending message immediately; only the optimistic write
    /// can fail here. Everything after — admission waits, the wire send,
    /// terminal status — is reported via fanout, never to this caller.
    pub async fn dispatch(
        self: &Arc<Self>,
        account: &Account,
        target: &TargetDescriptor,
        payload: &MessageContent,
        is_reply: bool,
    ) -> Result<Message, TetherError> {
        let conversation = self
            .store
            .get_or_create_conversation(&account.id, target)
            .await?;

        let now = chrono::Utc::now().to_rfc3339();
        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            account_id: account.id.clone(),
            direction: MessageDirection::Outbound,
            content_type: payload.kind().to_string(),
            body: body_text(payload),
            channel_message_id: None,
            status: MessageStatus::Pending,
            failure_reason: None,
            created_at: now.clone(),
            updated_at: now,
        };
        // A failed optimistic write aborts dispatch before any send attempt.
        self.store.insert_message(&message).await?;

        debug!(
            account_id = %account.id,
            message_id = %message.id,
            is_reply,
            "outbound message pending"
        );

        let dispatcher = Arc::clone(self);
        let account = account.clone();
        let target = target.clone();
        let payload = payload.clone();
        let pending = message.clone();
        tokio::spawn(async move {
            dispatcher.run_send(account, target, payload, pending, is_reply).await;
        });

        Ok(message)
    }

    /// The spawned sender: admission loop, wire send, terminal status.
    async fn run_send(
        self: Arc<Self>,
        account: Account,
        target: TargetDescriptor,
        payload: MessageContent,
        message: Message,
        is_reply: bool,
    ) {
        // Tied to the account lifecycle: destroy aborts the wait loop.
        let cancel = self.sessions.lifecycle_token(&account.id).child_token();

        // Serialize senders per account; cross-account dispatch stays
        // fully concurrent.
        let lock = self
            .send_locks
            .entry(account.id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let profile = match AccountProfile::from_account(&account) {
            Ok(profile) => profile,
            Err(e) => {
                self.fail(&account, &message, &e.to_string()).await;
                return;
            }
        };

        // New-vs-returning classification: replies target peers who already
        // wrote in; otherwise consult the store once to seed the governor's
        // advisory cache.
        if is_reply {
            self.governor.seed_contact(&account.id, &target, true);
        } else if !self.governor.contact_seeded(&account.id, &target) {
            match self.store.has_outbound_to_target(&account.id, &target).await {
                Ok(contacted) => self.governor.seed_contact(&account.id, &target, contacted),
                Err(e) => {
                    // Unseeded targets count as new: over-counts toward the
                    // daily cap, never under-counts.
                    warn!(account_id = %account.id, error = %e, "contact lookup failed");
                }
            }
        }
        let is_new_contact = !self.governor.contact_known(&account.id, &target);

        // Admission loop: sleep through soft denials, abort on a hard deny.
        loop {
            match self.governor.admit_send(&profile, &target) {
                AdmitDecision::Allow => break,
                AdmitDecision::RetryAfter { wait, reason } => {
                    debug!(
                        account_id = %account.id,
                        message_id = %message.id,
                        wait_ms = wait.as_millis() as u64,
                        reason = ?reason,
                        "send throttled, waiting"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            self.fail(&account, &message, REASON_SESSION_GONE).await;
                            return;
                        }
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                AdmitDecision::Deny { reason } => {
                    info!(
                        account_id = %account.id,
                        message_id = %message.id,
                        reason = ?reason,
                        "send hard-denied"
                    );
                    self.fail(&account, &message, REASON_DAILY_LIMIT).await;
                    return;
                }
            }
        }

        let Some(handle) = self.sessions.sender(&account.id) else {
            self.fail(&account, &message, REASON_NO_SESSION).await;
            return;
        };

        // Either outcome is a known attempt: record it so governor counters
        // never under-count wire traffic.
        match handle.send(&target, &payload).await {
            Ok(ack) => {
                self.governor.record_send(&profile, &target, is_new_contact);
                self.mark_sent_with_retry(&account, &message, &ack.channel_message_id.0)
                    .await;
            }
            Err(e) => {
                self.governor.record_send(&profile, &target, is_new_contact);
                self.fail(&account, &message, &e.to_string()).await;
            }
        }
    }

    /// Persist the `sent` transition. The send already happened and cannot
    /// be undone, so a failing status write is retried — but never re-sent.
    async fn mark_sent_with_retry(
        &self,
        account: &Account,
        message: &Message,
        channel_message_id: &str,
    ) {
        for attempt in 0u32..3 {
            match self
                .store
                .mark_message_sent(&message.id, channel_message_id)
                .await
            {
                Ok(true) => {
                    self.fanout.publish(
                        &account.id,
                        FanoutEvent::MessageStatus {
                            account_id: account.id.clone(),
                            message_id: message.id.clone(),
                            status: MessageStatus::Sent,
                            reason: None,
                        },
                    );
                    return;
                }
                Ok(false) => {
                    // The row already left `pending` (e.g. reconciled while
                    // we waited). Do not publish a second terminal event.
                    debug!(message_id = %message.id, "sent ack arrived after status left pending");
                    return;
                }
                Err(e) => {
                    warn!(
                        message_id = %message.id,
                        attempt,
                        error = %e,
                        "failed to persist sent status, retrying"
                    );
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
        warn!(message_id = %message.id, "giving up persisting sent status");
    }

    /// Drive the message to `failed` and publish the terminal event. The
    /// guarded update makes a duplicate failure transition a no-op.
    async fn fail(&self, account: &Account, message: &Message, reason: &str) {
        match self
            .store
            .advance_message_status(&message.id, MessageStatus::Failed, Some(reason))
            .await
        {
            Ok(true) => {
                self.fanout.publish(
                    &account.id,
                    FanoutEvent::MessageStatus {
                        account_id: account.id.clone(),
                        message_id: message.id.clone(),
                        status: MessageStatus::Failed,
                        reason: Some(reason.to_string()),
                    },
                );
            }
            Ok(false) => {
                debug!(message_id = %message.id, "failure transition was a no-op");
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "failed to persist failure status");
            }
        }
    }

    /// Drop the per-account send lock (account deletion).
    pub fn forget_account(&self, account_id: &str) {
        self.send_locks.remove(account_id);
    }
}

fn body_text(payload: &MessageContent) -> String {
    match payload {
        MessageContent::Text { body } => body.clone(),
        // Media payloads keep their structure in the body column.
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[async_trait]
impl StatusSink for MessageDispatcher {
    /// Apply an asynchronous delivery/read receipt from the transport.
    ///
    /// The guarded store update drops regressions and duplicates; incognito
    /// accounts store the receipt but suppress its propagation.
    async fn handle_delivery_status(
        &self,
        account: &Account,
        channel_message_id: &str,
        status: MessageStatus,
    ) {
        let message = match self
            .store
            .find_message_by_channel_id(&account.id, channel_message_id)
            .await
        {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(account_id = %account.id, channel_message_id, "receipt for unknown message");
                return;
            }
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "receipt lookup failed");
                return;
            }
        };

        match self
            .store
            .advance_message_status(&message.id, status, None)
            .await
        {
            Ok(true) => {
                if !account.incognito {
                    self.fanout.publish(
                        &account.id,
                        FanoutEvent::MessageStatus {
                            account_id: account.id.clone(),
                            message_id: message.id.clone(),
                            status,
                            reason: None,
                        },
                    );
                }
            }
            Ok(false) => {
                debug!(message_id = %message.id, ?status, "receipt ignored (regression or duplicate)");
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "failed to persist receipt");
            }
        }
    }
}
