// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact resolution.

use rusqlite::{params, Row};

use tether_core::types::Contact;
use tether_core::TetherError;

use crate::database::Database;

fn map_contact_row(row: &Row<'_>) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        account_id: row.get(1)?,
        external_id: row.get(2)?,
        display_name: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Resolve or create the contact for (account, external id).
///
/// A display name supplied later fills in a previously unnamed contact but
/// never overwrites an existing name.
pub async fn get_or_create_contact(
    db: &Database,
    account_id: &str,
    external_id: &str,
    display_name: Option<&str>,
) -> Result<Contact, TetherError> {
    let account_id = account_id.to_string();
    let external_id = external_id.to_string();
    let display_name = display_name.map(|n| n.to_string());
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, account_id, external_id, display_name, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (account_id, external_id) DO UPDATE SET
                     display_name = COALESCE(contacts.display_name, excluded.display_name)",
                params![id, account_id, external_id, display_name, now],
            )?;
            conn.query_row(
                "SELECT id, account_id, external_id, display_name, created_at
                 FROM contacts WHERE account_id = ?1 AND external_id = ?2",
                params![account_id, external_id],
                map_contact_row,
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}
