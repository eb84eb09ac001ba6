// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level assembly of the dispatch pipeline.
//!
//! `Relay` wires the governor, session manager, deduplicator, router, and
//! dispatcher together over the provided transport/store/fanout
//! collaborators, and owns the reconciliation sweep's lifetime.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use tether_config::TetherConfig;
use tether_core::types::{Account, AccountStatus, Message, MessageContent, TargetDescriptor};
use tether_core::{ChannelTransport, FanoutPublisher, RelayStore, TetherError};
use tether_rate::{RateGovernor, RateStats};
use tether_session::SessionManager;

use crate::dedup::Deduplicator;
use crate::dispatcher::MessageDispatcher;
use crate::reconcile::ReconcileSweep;
use crate::router::InboundRouter;

/// The assembled relay core.
pub struct Relay {
    store: Arc<dyn RelayStore>,
    governor: Arc<RateGovernor>,
    sessions: Arc<SessionManager>,
    dispatcher: Arc<MessageDispatcher>,
    shutdown_token: CancellationToken,
}

impl Relay {
    /// Assemble the pipeline and start the reconciliation sweep.
    pub fn new(
        config: &TetherConfig,
        transport: Arc<dyn ChannelTransport>,
        store: Arc<dyn RelayStore>,
        fanout: Arc<dyn FanoutPublisher>,
    ) -> Arc<Self> {
        let governor = Arc::new(RateGovernor::new(config.rate.clone()));
        let sessions = Arc::new(SessionManager::new(
            transport,
            Arc::clone(&store),
            Arc::clone(&fanout),
            config.session.clone(),
        ));
        let dedup = Arc::new(Deduplicator::new(
            Arc::clone(&store),
            Deduplicator::DEFAULT_CACHE_SIZE,
        ));
        let dispatcher = Arc::new(MessageDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&fanout),
            Arc::clone(&governor),
            Arc::clone(&sessions),
        ));
        let router = Arc::new(InboundRouter::new(
            Arc::clone(&store),
            Arc::clone(&fanout),
            dedup,
        ));
        let inbound_sink: Arc<dyn tether_core::InboundSink> = router;
        let status_sink: Arc<dyn tether_core::StatusSink> = dispatcher.clone();
        sessions.wire_sinks(inbound_sink, status_sink);

        let shutdown_token = CancellationToken::new();
        let sweep = Arc::new(ReconcileSweep::new(
            Arc::clone(&store),
            fanout,
            config.session.clone(),
        ));
        sweep.spawn(shutdown_token.clone());

        Arc::new(Self {
            store,
            governor,
            sessions,
            dispatcher,
            shutdown_token,
        })
    }

    /// Open a connection session for one account.
    pub async fn connect_account(&self, account_id: &str) -> Result<(), TetherError> {
        let account = self.require_account(account_id).await?;
        self.sessions.connect(account).await
    }

    /// Reconnect every account that is not terminally stopped. Used at
    /// startup to resume from the persisted state.
    pub async fn connect_all(&self) -> Result<usize, TetherError> {
        let mut connected = 0;
        for account in self.store.list_accounts().await? {
            if matches!(
                account.status,
                AccountStatus::Terminated | AccountStatus::Failed
            ) {
                continue;
            }
            let account_id = account.id.clone();
            match self.sessions.connect(account).await {
                Ok(()) => connected += 1,
                Err(e) => {
                    // Already persisted as `failed`; keep connecting the rest.
                    tracing::warn!(account_id = %account_id, error = %e, "account connect failed");
                }
            }
        }
        info!(connected, "account sessions started");
        Ok(connected)
    }

    /// Dispatch an outbound message for the account.
    pub async fn dispatch(
        &self,
        account_id: &str,
        target: &TargetDescriptor,
        payload: &MessageContent,
        is_reply: bool,
    ) -> Result<Message, TetherError> {
        let account = self.require_account(account_id).await?;
        self.dispatcher.dispatch(&account, target, payload, is_reply).await
    }

    /// Rate statistics for the account.
    pub async fn stats(&self, account_id: &str) -> Result<RateStats, TetherError> {
        let account = self.require_account(account_id).await?;
        let profile = tether_core::types::AccountProfile::from_account(&account)?;
        Ok(self.governor.stats(&profile))
    }

    /// Tear down the account's session, caches, and rows, in that order.
    pub async fn delete_account(&self, account_id: &str) -> Result<(), TetherError> {
        self.sessions.destroy(account_id).await;
        self.governor.forget_account(account_id);
        self.dispatcher.forget_account(account_id);
        self.store.delete_account(account_id).await
    }

    /// Graceful exit: stop the sweep and close every session.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();
        self.sessions.shutdown().await;
    }

    async fn require_account(&self, account_id: &str) -> Result<Account, TetherError> {
        self.store
            .get_account(account_id)
            .await?
            .ok_or_else(|| TetherError::Internal(format!("unknown account {account_id}")))
    }
}
