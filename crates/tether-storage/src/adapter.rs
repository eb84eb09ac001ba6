// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the RelayStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use tether_config::model::StorageConfig;
use tether_core::types::{
    Account, AccountStatus, Contact, Conversation, Message, MessageStatus, TargetDescriptor,
};
use tether_core::{InsertOutcome, RelayStore, TetherError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed relay store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`SqliteStore::initialize`].
pub struct SqliteStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given configuration.
    ///
    /// The database connection is not opened until [`initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database at the configured path and run migrations.
    pub async fn initialize(&self) -> Result<(), TetherError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| TetherError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite store initialized");
        Ok(())
    }

    /// Checkpoint the WAL and flush pending writes.
    pub async fn close(&self) -> Result<(), TetherError> {
        self.db()?.close().await
    }

    /// Simple connectivity probe used by the status command.
    pub async fn health_check(&self) -> Result<(), TetherError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)
    }

    /// Returns a reference to the underlying Database, or an error if not
    /// initialized.
    fn db(&self) -> Result<&Database, TetherError> {
        self.db.get().ok_or_else(|| TetherError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl RelayStore for SqliteStore {
    async fn create_account(&self, account: &Account) -> Result<(), TetherError> {
        queries::accounts::create_account(self.db()?, account).await
    }

    async fn get_account(&self, id: &str) -> Result<Option<Account>, TetherError> {
        queries::accounts::get_account(self.db()?, id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, TetherError> {
        queries::accounts::list_accounts(self.db()?).await
    }

    async fn update_account_status(
        &self,
        id: &str,
        status: AccountStatus,
        handle: Option<&str>,
    ) -> Result<(), TetherError> {
        queries::accounts::update_account_status(self.db()?, id, status, handle).await
    }

    async fn clear_session_artifacts(&self, id: &str) -> Result<(), TetherError> {
        queries::accounts::clear_session_artifacts(self.db()?, id).await
    }

    async fn delete_account(&self, id: &str) -> Result<(), TetherError> {
        queries::accounts::delete_account(self.db()?, id).await
    }

    async fn get_or_create_contact(
        &self,
        account_id: &str,
        external_id: &str,
        display_name: Option<&str>,
    ) -> Result<Contact, TetherError> {
        queries::contacts::get_or_create_contact(self.db()?, account_id, external_id, display_name)
            .await
    }

    async fn get_or_create_conversation(
        &self,
        account_id: &str,
        peer: &TargetDescriptor,
    ) -> Result<Conversation, TetherError> {
        queries::conversations::get_or_create_conversation(self.db()?, account_id, peer).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, TetherError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn bump_conversation(
        &self,
        conversation_id: &str,
        at: &str,
        increment_unread: bool,
    ) -> Result<(), TetherError> {
        queries::conversations::bump_conversation(self.db()?, conversation_id, at, increment_unread)
            .await
    }

    async fn insert_message(&self, message: &Message) -> Result<(), TetherError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn insert_message_if_absent(
        &self,
        message: &Message,
    ) -> Result<InsertOutcome, TetherError> {
        queries::messages::insert_message_if_absent(self.db()?, message).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, TetherError> {
        queries::messages::get_message(self.db()?, id).await
    }

    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, TetherError> {
        queries::messages::get_messages_for_conversation(self.db()?, conversation_id, limit).await
    }

    async fn find_message_by_channel_id(
        &self,
        account_id: &str,
        channel_message_id: &str,
    ) -> Result<Option<Message>, TetherError> {
        queries::messages::find_by_channel_id(self.db()?, account_id, channel_message_id).await
    }

    async fn channel_message_exists(
        &self,
        channel_message_id: &str,
    ) -> Result<bool, TetherError> {
        queries::messages::channel_message_exists(self.db()?, channel_message_id).await
    }

    async fn advance_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        failure_reason: Option<&str>,
    ) -> Result<bool, TetherError> {
        queries::messages::advance_status(self.db()?, message_id, status, failure_reason).await
    }

    async fn mark_message_sent(
        &self,
        message_id: &str,
        channel_message_id: &str,
    ) -> Result<bool, TetherError> {
        queries::messages::mark_sent(self.db()?, message_id, channel_message_id).await
    }

    async fn has_outbound_to_target(
        &self,
        account_id: &str,
        target: &TargetDescriptor,
    ) -> Result<bool, TetherError> {
        queries::messages::has_outbound_to_target(
            self.db()?,
            account_id,
            &target.kind.to_string(),
            &target.id,
        )
        .await
    }

    async fn stale_pending_messages(
        &self,
        older_than: &str,
    ) -> Result<Vec<Message>, TetherError> {
        queries::messages::stale_pending(self.db()?, older_than).await
    }
}
