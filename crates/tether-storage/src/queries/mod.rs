// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod accounts;
pub mod contacts;
pub mod conversations;
pub mod messages;

use std::str::FromStr;

/// Parse a TEXT column into a strum-backed enum, mapping parse failures to
/// a rusqlite conversion error so they surface through the normal row path.
pub(crate) fn parse_enum<T>(idx: usize, value: String) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
