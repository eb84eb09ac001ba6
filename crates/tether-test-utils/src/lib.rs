// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for the Tether workspace: a scriptable mock transport and
//! shared entity fixtures.

pub mod fixtures;
pub mod mock_transport;

pub use mock_transport::MockTransport;
