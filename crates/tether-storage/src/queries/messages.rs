// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD, guarded status transitions, and the dedup insert.

use rusqlite::{params, Row};

use tether_core::types::{Message, MessageStatus};
use tether_core::{InsertOutcome, TetherError};

use crate::database::Database;
use crate::queries::parse_enum;

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        account_id: row.get(2)?,
        direction: parse_enum(3, row.get::<_, String>(3)?)?,
        content_type: row.get(4)?,
        body: row.get(5)?,
        channel_message_id: row.get(6)?,
        status: parse_enum(7, row.get::<_, String>(7)?)?,
        failure_reason: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

const MESSAGE_COLUMNS: &str = "id, conversation_id, account_id, direction, content_type, body, \
                               channel_message_id, status, failure_reason, created_at, updated_at";

/// Insert a new message. Fails on any constraint violation.
pub async fn insert_message(db: &Database, msg: &Message) -> Result<(), TetherError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO messages
                     (id, conversation_id, account_id, direction, content_type, body,
                      channel_message_id, status, failure_reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.account_id,
                    msg.direction.to_string(),
                    msg.content_type,
                    msg.body,
                    msg.channel_message_id,
                    msg.status.to_string(),
                    msg.failure_reason,
                    msg.created_at,
                    msg.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert-if-absent keyed on the channel message id unique index.
///
/// `INSERT OR IGNORE` makes the unique-constraint outcome an explicit
/// signal: zero changed rows means an identical channel message id is
/// already stored, and that row — not any in-memory cache — is the dedup
/// source of truth.
pub async fn insert_message_if_absent(
    db: &Database,
    msg: &Message,
) -> Result<InsertOutcome, TetherError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO messages
                     (id, conversation_id, account_id, direction, content_type, body,
                      channel_message_id, status, failure_reason, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    msg.id,
                    msg.conversation_id,
                    msg.account_id,
                    msg.direction.to_string(),
                    msg.content_type,
                    msg.body,
                    msg.channel_message_id,
                    msg.status.to_string(),
                    msg.failure_reason,
                    msg.created_at,
                    msg.updated_at,
                ],
            )?;
            Ok(if changed == 1 {
                InsertOutcome::Inserted
            } else {
                InsertOutcome::Duplicate
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one message by id.
pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_message_row)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Messages for a conversation in chronological order.
pub async fn get_messages_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: Option<i64>,
) -> Result<Vec<Message>, TetherError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = match limit {
                Some(_) => format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                     ORDER BY created_at ASC LIMIT ?2"
                ),
                None => format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                     ORDER BY created_at ASC"
                ),
            };
            let mut stmt = conn.prepare(&sql)?;
            let mut messages = Vec::new();
            match limit {
                Some(lim) => {
                    let rows = stmt.query_map(params![conversation_id, lim], map_message_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
                None => {
                    let rows = stmt.query_map(params![conversation_id], map_message_row)?;
                    for row in rows {
                        messages.push(row?);
                    }
                }
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Look up a message by its channel-assigned id within one account.
pub async fn find_by_channel_id(
    db: &Database,
    account_id: &str,
    channel_message_id: &str,
) -> Result<Option<Message>, TetherError> {
    let account_id = account_id.to_string();
    let channel_message_id = channel_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE account_id = ?1 AND channel_message_id = ?2"
            ))?;
            let mut rows = stmt.query_map(params![account_id, channel_message_id], map_message_row)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether any row carries this channel message id (dedup probe).
pub async fn channel_message_exists(
    db: &Database,
    channel_message_id: &str,
) -> Result<bool, TetherError> {
    let channel_message_id = channel_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let exists: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM messages WHERE channel_message_id = ?1)",
                params![channel_message_id],
                |row| row.get(0),
            )?;
            Ok(exists != 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Guarded status advance: only fires when the stored status is a legal
/// predecessor, making duplicate receipts and regressions no-ops. Returns
/// whether a row was updated.
pub async fn advance_status(
    db: &Database,
    message_id: &str,
    status: MessageStatus,
    failure_reason: Option<&str>,
) -> Result<bool, TetherError> {
    let message_id = message_id.to_string();
    let failure_reason = failure_reason.map(|r| r.to_string());
    let predecessors: Vec<String> = status
        .legal_predecessors()
        .iter()
        .map(|s| s.to_string())
        .collect();
    if predecessors.is_empty() {
        // Nothing legally advances to this status (i.e. `pending`).
        return Ok(false);
    }
    let status = status.to_string();

    db.connection()
        .call(move |conn| {
            let placeholders = (0..predecessors.len())
                .map(|i| format!("?{}", i + 4))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE messages SET status = ?2, failure_reason = ?3,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status IN ({placeholders})"
            );
            let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![
                Box::new(message_id),
                Box::new(status),
                Box::new(failure_reason),
            ];
            for p in predecessors {
                values.push(Box::new(p));
            }
            let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a transport acknowledgment: channel id plus `pending -> sent`.
/// Returns false if the row had already left `pending`.
pub async fn mark_sent(
    db: &Database,
    message_id: &str,
    channel_message_id: &str,
) -> Result<bool, TetherError> {
    let message_id = message_id.to_string();
    let channel_message_id = channel_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'sent', channel_message_id = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![message_id, channel_message_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether the account has a completed outbound send to the peer.
pub async fn has_outbound_to_target(
    db: &Database,
    account_id: &str,
    peer_kind: &str,
    peer_id: &str,
) -> Result<bool, TetherError> {
    let account_id = account_id.to_string();
    let peer_kind = peer_kind.to_string();
    let peer_id = peer_id.to_string();
    db.connection()
        .call(move |conn| {
            let exists: i64 = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM messages m
                     JOIN conversations c ON m.conversation_id = c.id
                     WHERE c.account_id = ?1 AND c.peer_kind = ?2 AND c.peer_id = ?3
                       AND m.direction = 'outbound'
                       AND m.status IN ('sent', 'delivered', 'read'))",
                params![account_id, peer_kind, peer_id],
                |row| row.get(0),
            )?;
            Ok(exists != 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Outbound messages still `pending` older than the given RFC3339 timestamp.
pub async fn stale_pending(
    db: &Database,
    older_than: &str,
) -> Result<Vec<Message>, TetherError> {
    let older_than = older_than.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE status = 'pending' AND direction = 'outbound' AND created_at < ?1
                 ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map(params![older_than], map_message_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
