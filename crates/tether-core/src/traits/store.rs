// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistent store trait for relay entities.
//!
//! The store must provide an atomic "insert-if-absent by unique channel
//! message id" operation ([`RelayStore::insert_message_if_absent`]); the
//! deduplicator treats its [`InsertOutcome::Duplicate`] signal as the source
//! of truth, with in-memory caches purely as optimization.

use async_trait::async_trait;

use crate::error::TetherError;
use crate::types::{
    Account, AccountStatus, Contact, Conversation, Message, MessageStatus, TargetDescriptor,
};

/// Result of a conditional insert keyed on the channel message id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The row was inserted; this delivery is the first.
    Inserted,
    /// The unique constraint fired; an identical message already exists.
    Duplicate,
}

/// Read/write contract the relay core consumes from the persistence layer.
#[async_trait]
pub trait RelayStore: Send + Sync + 'static {
    // --- Accounts ---

    async fn create_account(&self, account: &Account) -> Result<(), TetherError>;

    async fn get_account(&self, id: &str) -> Result<Option<Account>, TetherError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, TetherError>;

    /// Persist a lifecycle status transition, optionally updating the
    /// resolved handle.
    async fn update_account_status(
        &self,
        id: &str,
        status: AccountStatus,
        handle: Option<&str>,
    ) -> Result<(), TetherError>;

    /// Discard stored transport credentials after an unrecoverable close.
    async fn clear_session_artifacts(&self, id: &str) -> Result<(), TetherError>;

    /// Cascade-deletes the account's conversations and messages.
    async fn delete_account(&self, id: &str) -> Result<(), TetherError>;

    // --- Contacts ---

    async fn get_or_create_contact(
        &self,
        account_id: &str,
        external_id: &str,
        display_name: Option<&str>,
    ) -> Result<Contact, TetherError>;

    // --- Conversations ---

    /// Resolve the unique conversation for an (account, peer) pair, creating
    /// it on first contact.
    async fn get_or_create_conversation(
        &self,
        account_id: &str,
        peer: &TargetDescriptor,
    ) -> Result<Conversation, TetherError>;

    async fn get_conversation(
        &self,
        id: &str,
    ) -> Result<Option<Conversation>, TetherError>;

    /// Update last-activity and optionally increment the unread counter.
    async fn bump_conversation(
        &self,
        conversation_id: &str,
        at: &str,
        increment_unread: bool,
    ) -> Result<(), TetherError>;

    // --- Messages ---

    async fn insert_message(&self, message: &Message) -> Result<(), TetherError>;

    /// Atomic insert-if-absent keyed on the channel message id unique index.
    async fn insert_message_if_absent(
        &self,
        message: &Message,
    ) -> Result<InsertOutcome, TetherError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, TetherError>;

    /// Conversation history in chronological order. This is the normal
    /// message list — failed sends surface here with their reason, not
    /// through a separate error channel.
    async fn get_conversation_messages(
        &self,
        conversation_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, TetherError>;

    async fn find_message_by_channel_id(
        &self,
        account_id: &str,
        channel_message_id: &str,
    ) -> Result<Option<Message>, TetherError>;

    /// Whether any message row carries this channel message id (dedup probe).
    async fn channel_message_exists(
        &self,
        channel_message_id: &str,
    ) -> Result<bool, TetherError>;

    /// Guarded status advance: updates only when the stored status is a legal
    /// predecessor of `status`. Returns whether a row was updated, so callers
    /// can suppress duplicate terminal fanout events.
    async fn advance_message_status(
        &self,
        message_id: &str,
        status: MessageStatus,
        failure_reason: Option<&str>,
    ) -> Result<bool, TetherError>;

    /// Record the transport acknowledgment: channel id plus `pending -> sent`.
    /// Returns false if the row had already left `pending`.
    async fn mark_message_sent(
        &self,
        message_id: &str,
        channel_message_id: &str,
    ) -> Result<bool, TetherError>;

    /// Whether the account has ever completed an outbound send to the target
    /// (new-contact classification; seeds the governor's advisory cache).
    async fn has_outbound_to_target(
        &self,
        account_id: &str,
        target: &TargetDescriptor,
    ) -> Result<bool, TetherError>;

    /// Outbound messages still `pending` with a creation timestamp older
    /// than `older_than` (RFC3339), for the reconciliation sweep.
    async fn stale_pending_messages(
        &self,
        older_than: &str,
    ) -> Result<Vec<Message>, TetherError>;
}
