// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tether relay.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tether configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TetherConfig {
    /// Relay identity and logging settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Outbound rate-governor settings.
    #[serde(default)]
    pub rate: RateLimitConfig,

    /// Connection session settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Channel adapter bridge settings.
    #[serde(default)]
    pub bridge: BridgeConfig,
}

/// Relay identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Display name of the relay instance.
    #[serde(default = "default_relay_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            name: default_relay_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_relay_name() -> String {
    "tether".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// One step of the daily new-contact cap table. An account whose age in days
/// is at least `min_age_days` (and below the next tier's threshold) gets
/// `cap` new contacts per UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DailyCapTier {
    pub min_age_days: i64,
    pub cap: u32,
}

/// Outbound rate-governor configuration.
///
/// The defaults are deliberately conservative: they model the send cadence a
/// careful human operator would produce, which is what keeps the underlying
/// account off the channel provider's automation radar.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Sliding-window length in seconds for the per-account send cap.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Maximum sends per account within one sliding window.
    #[serde(default = "default_window_max_sends")]
    pub window_max_sends: u32,

    /// Minimum spacing between two sends to the same target, in seconds.
    #[serde(default = "default_target_spacing_secs")]
    pub target_spacing_secs: u64,

    /// Sends per batch before the cooldown is enforced.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Cooldown after a full batch, in seconds.
    #[serde(default = "default_batch_cooldown_secs")]
    pub batch_cooldown_secs: u64,

    /// Days after account creation during which the narrowest daily cap
    /// applies regardless of tier table.
    #[serde(default = "default_warmup_days")]
    pub warmup_days: i64,

    /// Daily new-contact cap table keyed by account age, ascending.
    #[serde(default = "default_daily_tiers")]
    pub daily_tiers: Vec<DailyCapTier>,

    /// Maximum per-target records retained per account before
    /// oldest-eviction.
    #[serde(default = "default_contact_cache_size")]
    pub contact_cache_size: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            window_max_sends: default_window_max_sends(),
            target_spacing_secs: default_target_spacing_secs(),
            batch_size: default_batch_size(),
            batch_cooldown_secs: default_batch_cooldown_secs(),
            warmup_days: default_warmup_days(),
            daily_tiers: default_daily_tiers(),
            contact_cache_size: default_contact_cache_size(),
        }
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_window_max_sends() -> u32 {
    15
}

fn default_target_spacing_secs() -> u64 {
    6
}

fn default_batch_size() -> u32 {
    50
}

fn default_batch_cooldown_secs() -> u64 {
    300 // 5 minutes
}

fn default_warmup_days() -> i64 {
    7
}

fn default_daily_tiers() -> Vec<DailyCapTier> {
    vec![
        DailyCapTier { min_age_days: 0, cap: 30 },
        DailyCapTier { min_age_days: 3, cap: 60 },
        DailyCapTier { min_age_days: 7, cap: 150 },
        DailyCapTier { min_age_days: 14, cap: 300 },
        DailyCapTier { min_age_days: 30, cap: 1000 },
    ]
}

fn default_contact_cache_size() -> usize {
    4096
}

/// Connection session configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Backoff before reconnecting after a recoverable close, in seconds.
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,

    /// Age after which a still-`pending` message is reconciled to `failed`,
    /// in seconds.
    #[serde(default = "default_pending_stale_secs")]
    pub pending_stale_secs: u64,

    /// Interval between reconciliation sweeps, in seconds.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
            pending_stale_secs: default_pending_stale_secs(),
            reconcile_interval_secs: default_reconcile_interval_secs(),
        }
    }
}

fn default_reconnect_backoff_secs() -> u64 {
    5
}

fn default_pending_stale_secs() -> u64 {
    900 // 15 minutes
}

fn default_reconcile_interval_secs() -> u64 {
    60
}

/// Channel adapter bridge configuration.
///
/// The wire protocol itself lives in an external adapter process; the relay
/// spawns one per account and exchanges JSON lines with it over stdio.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Adapter executable. `None` disables outbound channel connectivity.
    #[serde(default)]
    pub command: Option<String>,

    /// Extra arguments passed before the account id and channel kind.
    #[serde(default)]
    pub args: Vec<String>,

    /// Seconds to wait for a send acknowledgment before failing the send.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: Vec::new(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tether").join("tether.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tether.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}
