// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. The `Database` struct IS the single writer; query modules accept
//! `&Database` and call through `connection().call()`. Do NOT create
//! additional Connection instances for writes.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use tether_core::TetherError;

use crate::migrations;

/// Handle to the single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs, and run all
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, TetherError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TetherError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path).await.map_err(map_sqlite_err)?;

        conn.call(|conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| Ok(migrations::run_migrations(conn)))
            .await
            .map_err(map_tr_err)??;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), TetherError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the storage error variant.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> TetherError {
    TetherError::Storage {
        source: Box::new(err),
    }
}

/// Map a rusqlite error into the storage error variant. `Connection::open`
/// surfaces the raw `rusqlite::Error` rather than the tokio-rusqlite wrapper.
pub fn map_sqlite_err(err: rusqlite::Error) -> TetherError {
    TetherError::Storage {
        source: Box::new(err),
    }
}
