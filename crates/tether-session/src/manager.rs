// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-account connection sessions over the external channel transport.
//!
//! Each connected account runs one event-loop task that drains the
//! transport's event stream and drives the account status machine:
//! `qr_pending -> connecting -> connected -> disconnected`, then either an
//! automatic reconnect (recoverable close) or a terminal stop (logout,
//! destroy). Every transition persists the account status and publishes a
//! fanout event.
//!
//! Lifecycle ownership: a per-account [`CancellationToken`] outlives
//! individual transport connections, so a reconnect backoff timer and any
//! in-flight dispatch tied to the account die together on `destroy`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use tether_config::model::SessionConfig;
use tether_core::types::{
    Account, AccountStatus, ChannelKind, FanoutEvent, TransportEvent,
};
use tether_core::{
    ChannelTransport, FanoutPublisher, InboundSink, RelayStore, StatusSink, TetherError,
    TransportHandle,
};

/// Owns the live sessions: one event-loop task and transport handle per
/// connected account.
pub struct SessionManager {
    transport: Arc<dyn ChannelTransport>,
    store: Arc<dyn RelayStore>,
    fanout: Arc<dyn FanoutPublisher>,
    config: SessionConfig,
    /// Live send handles, present only while a transport connection is open.
    handles: DashMap<String, Arc<dyn TransportHandle>>,
    /// Per-account lifecycle tokens; survive reconnect cycles.
    lifecycles: DashMap<String, CancellationToken>,
    /// Wired once at relay construction; events arriving earlier are dropped.
    inbound_sink: OnceCell<Arc<dyn InboundSink>>,
    status_sink: OnceCell<Arc<dyn StatusSink>>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        store: Arc<dyn RelayStore>,
        fanout: Arc<dyn FanoutPublisher>,
        config: SessionConfig,
    ) -> Self {
        Self {
            transport,
            store,
            fanout,
            config,
            handles: DashMap::new(),
            lifecycles: DashMap::new(),
            inbound_sink: OnceCell::new(),
            status_sink: OnceCell::new(),
        }
    }

    /// Wire the inbound/status sinks. Called once while assembling the relay.
    pub fn wire_sinks(&self, inbound: Arc<dyn InboundSink>, status: Arc<dyn StatusSink>) {
        let inbound_set = self.inbound_sink.set(inbound).is_ok();
        let status_set = self.status_sink.set(status).is_ok();
        if !inbound_set || !status_set {
            warn!("session sinks were already wired");
        }
    }

    /// Open a transport connection for the account and start its event loop.
    ///
    /// A construction failure persists the terminal `failed` status and
    /// surfaces to the caller; no retry loop is started from here.
    pub async fn connect(self: &Arc<Self>, account: Account) -> Result<(), TetherError> {
        // Replace any previous connection for this account.
        if let Some((_, old)) = self.handles.remove(&account.id) {
            old.close().await;
        }

        let connection = match self.transport.connect(&account).await {
            Ok(connection) => connection,
            Err(e) => {
                self.persist_status(&account.id, AccountStatus::Failed, None).await;
                return Err(e);
            }
        };

        // Pairing-based channels wait for out-of-band pairing first; token
        // channels go straight to connecting.
        let initial = match account.channel {
            ChannelKind::Whatsapp => AccountStatus::QrPending,
            ChannelKind::Commerce => AccountStatus::Connecting,
        };
        self.persist_status(&account.id, initial, None).await;

        let token = self.lifecycle_token(&account.id);
        self.handles.insert(account.id.clone(), Arc::clone(&connection.handle));

        let manager = Arc::clone(self);
        let handle = Arc::clone(&connection.handle);
        let mut events = connection.events;
        tokio::spawn(async move {
            manager.run_loop(account, handle, &mut events, token).await;
        });
        Ok(())
    }

    /// The live send handle for an account, if a connection is open.
    pub fn sender(&self, account_id: &str) -> Option<Arc<dyn TransportHandle>> {
        self.handles.get(account_id).map(|entry| Arc::clone(entry.value()))
    }

    /// The account's lifecycle token. Dispatch tasks tie their cancellation
    /// to it so `destroy` also aborts in-flight sends.
    pub fn lifecycle_token(&self, account_id: &str) -> CancellationToken {
        let mut entry = self
            .lifecycles
            .entry(account_id.to_string())
            .or_insert_with(CancellationToken::new);
        // A cancelled token means the account was destroyed earlier in this
        // process; a new connect gets a fresh lifecycle.
        if entry.is_cancelled() {
            *entry.value_mut() = CancellationToken::new();
        }
        entry.clone()
    }

    /// Whether a transport connection is currently open.
    pub fn is_active(&self, account_id: &str) -> bool {
        self.handles.contains_key(account_id)
    }

    /// Tear down the account's session: cancel the lifecycle (reconnect
    /// timers and in-flight dispatch included), release the transport, and
    /// persist the terminal `terminated` status.
    pub async fn destroy(&self, account_id: &str) {
        if let Some((_, token)) = self.lifecycles.remove(account_id) {
            token.cancel();
        }
        if let Some((_, handle)) = self.handles.remove(account_id) {
            handle.close().await;
        }
        self.persist_status(account_id, AccountStatus::Terminated, None).await;
        info!(account_id, "session destroyed");
    }

    /// Process-exit teardown: close every connection and persist
    /// `disconnected` so accounts resume on the next start.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.handles.iter().map(|e| e.key().clone()).collect();
        for account_id in ids {
            if let Some((_, token)) = self.lifecycles.remove(&account_id) {
                token.cancel();
            }
            if let Some((_, handle)) = self.handles.remove(&account_id) {
                handle.close().await;
            }
            self.persist_status(&account_id, AccountStatus::Disconnected, None).await;
        }
        debug!("all sessions shut down");
    }

    /// One account's event loop: drains transport events until close or
    /// cancellation.
    async fn run_loop(
        self: Arc<Self>,
        mut account: Account,
        handle: Arc<dyn TransportHandle>,
        events: &mut tokio::sync::mpsc::Receiver<TransportEvent>,
        token: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    handle.close().await;
                    debug!(account_id = %account.id, "session loop cancelled");
                    return;
                }
                maybe_event = events.recv() => {
                    let Some(event) = maybe_event else {
                        // The transport dropped its stream without a close
                        // event; treat it as a recoverable network drop.
                        self.on_closed(&account, &handle, true, "event stream ended", &token).await;
                        return;
                    };
                    match event {
                        TransportEvent::PairingData(code) => {
                            self.persist_status(&account.id, AccountStatus::QrPending, None).await;
                            self.fanout.publish(&account.id, FanoutEvent::PairingCode {
                                account_id: account.id.clone(),
                                code,
                            });
                        }
                        TransportEvent::Opened { handle: resolved } => {
                            info!(account_id = %account.id, handle = %resolved, "transport opened");
                            account.handle = Some(resolved.clone());
                            self.persist_status(
                                &account.id,
                                AccountStatus::Connected,
                                Some(&resolved),
                            ).await;
                        }
                        TransportEvent::Closed { recoverable, detail } => {
                            self.on_closed(&account, &handle, recoverable, &detail, &token).await;
                            return;
                        }
                        TransportEvent::Inbound(inbound) => {
                            match self.inbound_sink.get() {
                                Some(sink) => sink.handle_inbound(&account, inbound).await,
                                None => warn!(account_id = %account.id, "inbound event dropped: no sink wired"),
                            }
                        }
                        TransportEvent::DeliveryStatus { channel_message_id, status } => {
                            match self.status_sink.get() {
                                Some(sink) => {
                                    sink.handle_delivery_status(&account, &channel_message_id, status).await;
                                }
                                None => warn!(account_id = %account.id, "delivery status dropped: no sink wired"),
                            }
                        }
                    }
                }
            }
        }
    }

    /// Shared close handling: persist `disconnected`, then either schedule a
    /// reconnect (recoverable) or discard session artifacts (logout).
    async fn on_closed(
        self: &Arc<Self>,
        account: &Account,
        handle: &Arc<dyn TransportHandle>,
        recoverable: bool,
        detail: &str,
        token: &CancellationToken,
    ) {
        warn!(account_id = %account.id, recoverable, detail, "transport closed");
        self.handles.remove(&account.id);
        handle.close().await;
        self.persist_status(&account.id, AccountStatus::Disconnected, None).await;

        if !recoverable {
            // Explicit logout: local session artifacts are useless now.
            if let Err(e) = self.store.clear_session_artifacts(&account.id).await {
                warn!(account_id = %account.id, error = %e, "failed to clear session artifacts");
            }
            return;
        }
        if token.is_cancelled() {
            return;
        }

        let manager = Arc::clone(self);
        let account_id = account.id.clone();
        let backoff = Duration::from_secs(self.config.reconnect_backoff_secs);
        let token = token.clone();
        // Spawned from a child module: the session loop and the reconnect task
        // spawn into each other, which makes the `Send` auto-trait inference of
        // `connect` cyclic within this scope. Registering the reconnect spawn in
        // a separate module breaks that cycle without changing behavior.
        reconnect::spawn(manager, account_id, backoff, token);
    }

    /// Persist an account status transition and publish the fanout event.
    /// Storage failures are logged, never propagated: the loop's job is to
    /// keep draining the transport.
    async fn persist_status(&self, account_id: &str, status: AccountStatus, handle: Option<&str>) {
        if let Err(e) = self.store.update_account_status(account_id, status, handle).await {
            warn!(account_id, %status, error = %e, "failed to persist account status");
        }
        self.fanout.publish(
            account_id,
            FanoutEvent::AccountStatus {
                account_id: account_id.to_string(),
                status,
                handle: handle.map(|h| h.to_string()),
            },
        );
    }
}

/// Reconnect scheduling lives here so the `connect` opaque future is resolved
/// outside the session loop's defining scope, breaking the cyclic `Send`
/// inference between the event loop and the reconnect task.
mod reconnect {
    use super::*;

    pub(super) fn spawn(
        manager: Arc<SessionManager>,
        account_id: String,
        backoff: Duration,
        token: CancellationToken,
    ) {
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(account_id = %account_id, "reconnect cancelled");
                }
                _ = tokio::time::sleep(backoff) => {
                    // Re-fetch: the account may have been deleted while waiting.
                    match manager.store.get_account(&account_id).await {
                        Ok(Some(fresh)) => {
                            info!(account_id = %account_id, "reconnecting after backoff");
                            if let Err(e) = manager.connect(fresh).await {
                                warn!(account_id = %account_id, error = %e, "reconnect failed");
                            }
                        }
                        Ok(None) => {
                            debug!(account_id = %account_id, "account gone, skipping reconnect");
                        }
                        Err(e) => {
                            warn!(account_id = %account_id, error = %e, "reconnect lookup failed");
                        }
                    }
                }
            }
        });
    }
}
