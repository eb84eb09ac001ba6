// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `tether-core::types` for use across
//! the collaborator trait boundaries. This module re-exports them for
//! convenience within the storage crate.

pub use tether_core::types::{Account, Contact, Conversation, Message};
