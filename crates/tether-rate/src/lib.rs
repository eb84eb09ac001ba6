// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-governed admission control for the Tether relay.
//!
//! This crate answers one question — "can account A send to target T right
//! now?" — and records outcomes. It performs no I/O; the dispatcher owns the
//! sleeping, retrying, and persistence around it.

pub mod governor;

pub use governor::{
    AdmitDecision, DenyReason, RateGovernor, RateStats, RiskLevel, ThrottleReason,
};
