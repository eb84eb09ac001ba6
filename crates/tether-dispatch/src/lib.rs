// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The rate-governed dispatch pipeline: outbound dispatch, inbound routing,
//! deduplication, and pending-message reconciliation, assembled by [`Relay`].

pub mod dedup;
pub mod dispatcher;
pub mod reconcile;
pub mod relay;
pub mod router;

pub use dedup::Deduplicator;
pub use dispatcher::MessageDispatcher;
pub use reconcile::ReconcileSweep;
pub use relay::Relay;
pub use router::InboundRouter;
