// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Account CRUD operations.

use rusqlite::{params, Row};

use tether_core::types::{Account, AccountStatus};
use tether_core::TetherError;

use crate::database::Database;
use crate::queries::parse_enum;

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        channel: parse_enum(1, row.get::<_, String>(1)?)?,
        status: parse_enum(2, row.get::<_, String>(2)?)?,
        handle: row.get(3)?,
        incognito: row.get::<_, i64>(4)? != 0,
        session_blob: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

const ACCOUNT_COLUMNS: &str =
    "id, channel, status, handle, incognito, session_blob, created_at, updated_at";

/// Insert a new account.
pub async fn create_account(db: &Database, account: &Account) -> Result<(), TetherError> {
    let account = account.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, channel, status, handle, incognito, session_blob, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    account.id,
                    account.channel.to_string(),
                    account.status.to_string(),
                    account.handle,
                    account.incognito as i64,
                    account.session_blob,
                    account.created_at,
                    account.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one account by id.
pub async fn get_account(db: &Database, id: &str) -> Result<Option<Account>, TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], map_account_row)?;
            rows.next().transpose()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All accounts, oldest first.
pub async fn list_accounts(db: &Database) -> Result<Vec<Account>, TetherError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at ASC"
            ))?;
            let rows = stmt.query_map([], map_account_row)?;
            let mut accounts = Vec::new();
            for row in rows {
                accounts.push(row?);
            }
            Ok(accounts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist a lifecycle status transition. A `Some` handle also updates the
/// resolved identity attribute; `None` leaves it untouched.
pub async fn update_account_status(
    db: &Database,
    id: &str,
    status: AccountStatus,
    handle: Option<&str>,
) -> Result<(), TetherError> {
    let id = id.to_string();
    let status = status.to_string();
    let handle = handle.map(|h| h.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE accounts SET status = ?2,
                 handle = COALESCE(?3, handle),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, status, handle],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Discard stored transport credentials (unrecoverable close).
pub async fn clear_session_artifacts(db: &Database, id: &str) -> Result<(), TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE accounts SET session_blob = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete an account; conversations and messages cascade.
pub async fn delete_account(db: &Database, id: &str) -> Result<(), TetherError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
