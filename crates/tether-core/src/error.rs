// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tether relay.
//!
//! Rate-limit admission denial is deliberately NOT represented here: denial
//! is a first-class return value of the governor, never an error.

use thiserror::Error;

/// The primary error type used across all Tether collaborator traits and
/// core operations.
#[derive(Debug, Error)]
pub enum TetherError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel transport errors (connection failure, send rejection, framing).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No live connection session exists for the account.
    #[error("no active session for account {account_id}")]
    SessionUnavailable { account_id: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TetherError {
    /// Shorthand for a transport error with a message only.
    pub fn transport(message: impl Into<String>) -> Self {
        TetherError::Transport {
            message: message.into(),
            source: None,
        }
    }
}
