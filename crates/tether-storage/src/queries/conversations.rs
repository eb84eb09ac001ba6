// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation resolution and activity tracking.
//!
//! The UNIQUE (account_id, peer_kind, peer_id) constraint enforces the
//! one-conversation-per-peer invariant; get-or-create rides on it.

use rusqlite::{params, Row};

use tether_core::types::{Conversation, TargetDescriptor};
use tether_core::TetherError;

use crate::database::Database;
use crate::queries::parse_enum;

fn map_conversation_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        account_id: row.get(1)?,
        peer_kind: parse_enum(2, row.get::<_, String>(2)?)?,
        peer_id: row.get(3)?,
        unread_count: row.get(4)?,
        last_activity_at: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const CONVERSATION_COLUMNS: &str =
    "id, account_id, peer_kind, peer_id, unread_count, last_activity_at, created_at";

/// Resolve or create the unique conversation for (account, peer).
pub async fn get_or_create_conversation(
    db: &Database,
    account_id: &str,
    peer: &TargetDescriptor,
) -> Result<Conversation, TetherError> {
    let account_id = account_id.to_string();
    let peer_kind = peer.kind.to_string();
    let peer_id = peer.id.clone();
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO conversations
                     (id, account_id, peer_kind, peer_id, unread_count, last_activity_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
                params![id, account_id, peer_kind, peer_id, now],
            )?;
            conn.query_row(
                &format!(
                    "SELECT {CONVERSATION_COLUMNS} FROM conversations
                     WHERE account_id = ?1 AND peer_kind = ?2 AND peer_id = ?3"
                ),
                params![account_id, peer_kind, peer_id],
                map_conversation_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one conversation by id.
pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_conversation_row)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update last-activity and optionally increment the unread counter.
pub async fn bump_conversation(
    db: &Database,
    conversation_id: &str,
    at: &str,
    increment_unread: bool,
) -> Result<(), TetherError> {
    let conversation_id = conversation_id.to_string();
    let at = at.to_string();
    let increment: i64 = if increment_unread { 1 } else { 0 };
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET
                     last_activity_at = ?2,
                     unread_count = unread_count + ?3
                 WHERE id = ?1",
                params![conversation_id, at, increment],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tether_core::types::{Account, AccountStatus, ChannelKind, TargetKind};

    async fn setup_db_with_account() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let account = Account {
            id: "acc-1".to_string(),
            channel: ChannelKind::Whatsapp,
            status: AccountStatus::Connecting,
            handle: None,
            incognito: false,
            session_blob: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        };
        crate::queries::accounts::create_account(&db, &account)
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn conversation_is_unique_per_peer() {
        let (db, _dir) = setup_db_with_account().await;
        let peer = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");

        let first = get_or_create_conversation(&db, "acc-1", &peer).await.unwrap();
        let second = get_or_create_conversation(&db, "acc-1", &peer).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.peer_kind, TargetKind::Contact);

        // A group with the same raw id is a distinct conversation.
        let group = TargetDescriptor::group(ChannelKind::Whatsapp, "551199");
        let third = get_or_create_conversation(&db, "acc-1", &group).await.unwrap();
        assert_ne!(first.id, third.id);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn bump_increments_unread_and_activity() {
        let (db, _dir) = setup_db_with_account().await;
        let peer = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
        let conversation = get_or_create_conversation(&db, "acc-1", &peer).await.unwrap();

        bump_conversation(&db, &conversation.id, "2026-01-02T10:00:00.000Z", true)
            .await
            .unwrap();
        bump_conversation(&db, &conversation.id, "2026-01-02T11:00:00.000Z", false)
            .await
            .unwrap();

        let updated = get_conversation(&db, &conversation.id).await.unwrap().unwrap();
        assert_eq!(updated.unread_count, 1);
        assert_eq!(updated.last_activity_at, "2026-01-02T11:00:00.000Z");
        db.close().await.unwrap();
    }
}
