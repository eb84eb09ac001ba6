// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The admission-control engine deciding whether an account may send to a
//! target right now.
//!
//! Four checks run in order: sliding-window cap, per-target spacing, batch
//! cooldown, daily new-contact cap. The first three are soft denials the
//! caller sleeps through; the daily cap is a hard deny (no amount of waiting
//! helps within the same UTC day). The window cap is re-evaluated on every
//! retry, so it remains the outer bound even after a long per-target wait.
//!
//! State is partitioned by account in a `DashMap`; each entry is only ever
//! touched under its shard guard, so counters for one account update
//! atomically without cross-account contention. Everything here is a cache:
//! process restart drops it, the persistent store stays authoritative.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use dashmap::DashMap;
use serde::Serialize;

use tether_config::model::RateLimitConfig;
use tether_core::types::{AccountProfile, TargetDescriptor};

/// Why an admission was softly denied. The caller should wait and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleReason {
    /// The per-account sliding-window cap is full.
    WindowCap,
    /// The target was messaged too recently.
    TargetSpacing,
    /// A full batch forces a cooldown.
    BatchCooldown,
}

/// Why an admission was hard-denied. Waiting does not help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The daily new-contact cap for the account's age tier is exhausted.
    DailyCap,
}

/// Outcome of an admission check. Denial is a value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitDecision {
    /// Send now.
    Allow,
    /// Denied for now; retry after `wait`.
    RetryAfter { wait: Duration, reason: ThrottleReason },
    /// Denied for the rest of the UTC day.
    Deny { reason: DenyReason },
}

impl AdmitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmitDecision::Allow)
    }

    /// Wait hint for soft denials.
    pub fn wait_hint(&self) -> Option<Duration> {
        match self {
            AdmitDecision::RetryAfter { wait, .. } => Some(*wait),
            _ => None,
        }
    }
}

/// Ban-risk classification derived from daily usage and warm-up status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Caution,
    Warning,
}

/// Point-in-time rate statistics for one account.
#[derive(Debug, Clone, Serialize)]
pub struct RateStats {
    pub age_days: i64,
    pub is_warmup: bool,
    pub daily_limit: u32,
    pub daily_used: u32,
    pub last_minute_count: usize,
    pub batch_count: u32,
    pub risk: RiskLevel,
}

/// Advisory per-target record: spacing anchor plus the ever-contacted flag.
#[derive(Debug, Clone)]
struct TargetRecord {
    last_send: Option<DateTime<Utc>>,
    contacted: bool,
}

/// Per-account mutable rate state.
#[derive(Debug)]
struct RateState {
    sends: VecDeque<DateTime<Utc>>,
    last_send: Option<DateTime<Utc>>,
    daily_new_contacts: u32,
    daily_date: NaiveDate,
    batch_count: u32,
    batch_filled_at: Option<DateTime<Utc>>,
    targets: HashMap<String, TargetRecord>,
}

impl RateState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            sends: VecDeque::new(),
            last_send: None,
            daily_new_contacts: 0,
            daily_date: now.date_naive(),
            batch_count: 0,
            batch_filled_at: None,
            targets: HashMap::new(),
        }
    }

    /// Reset the daily counter when the UTC day rolls over.
    fn roll_day(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.daily_date {
            self.daily_date = today;
            self.daily_new_contacts = 0;
        }
    }

    /// Drop window entries older than `now - window`.
    fn prune_window(&mut self, now: DateTime<Utc>, window: TimeDelta) {
        let horizon = now - window;
        while let Some(front) = self.sends.front() {
            if *front <= horizon {
                self.sends.pop_front();
            } else {
                break;
            }
        }
    }

    /// Evict oldest per-target records until the cache is within bound.
    fn evict_targets(&mut self, cap: usize) {
        while self.targets.len() > cap {
            let oldest = self
                .targets
                .iter()
                .min_by_key(|(_, rec)| rec.last_send)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.targets.remove(&key);
                }
                None => break,
            }
        }
    }
}

/// Pure, in-memory admission-control engine.
///
/// Account age (for warm-up tiering) travels in the [`AccountProfile`]
/// argument; the "ever sent to this target" classification lives in an
/// advisory cache seeded from the store via [`RateGovernor::seed_contact`].
/// The governor itself performs no I/O.
pub struct RateGovernor {
    config: RateLimitConfig,
    accounts: DashMap<String, RateState>,
}

impl RateGovernor {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            accounts: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Can `account` send to `target` right now?
    pub fn admit_send(&self, account: &AccountProfile, target: &TargetDescriptor) -> AdmitDecision {
        self.admit_send_at(account, target, Utc::now())
    }

    /// Deterministic-time variant of [`RateGovernor::admit_send`].
    pub fn admit_send_at(
        &self,
        account: &AccountProfile,
        target: &TargetDescriptor,
        now: DateTime<Utc>,
    ) -> AdmitDecision {
        let window = TimeDelta::seconds(self.config.window_secs as i64);
        let spacing = TimeDelta::seconds(self.config.target_spacing_secs as i64);
        let cooldown = TimeDelta::seconds(self.config.batch_cooldown_secs as i64);
        let key = target.cache_key();

        let mut entry = self
            .accounts
            .entry(account.id.clone())
            .or_insert_with(|| RateState::new(now));
        let state = entry.value_mut();
        state.roll_day(now);
        state.prune_window(now, window);

        // (a) sliding-window cap: the outer bound on every (re-)check.
        if state.sends.len() >= self.config.window_max_sends as usize {
            if let Some(oldest) = state.sends.front() {
                let wait = (*oldest + window) - now;
                return AdmitDecision::RetryAfter {
                    wait: clamp_wait(wait),
                    reason: ThrottleReason::WindowCap,
                };
            }
        }

        // (b) minimum spacing since the last send to this specific target.
        if let Some(last) = state.targets.get(&key).and_then(|rec| rec.last_send) {
            let elapsed = now - last;
            if elapsed < spacing {
                return AdmitDecision::RetryAfter {
                    wait: clamp_wait(spacing - elapsed),
                    reason: ThrottleReason::TargetSpacing,
                };
            }
        }

        // (c) batch cooldown, anchored at the send that filled the batch.
        if state.batch_count >= self.config.batch_size {
            match state.batch_filled_at {
                Some(filled_at) => {
                    let resume_at = filled_at + cooldown;
                    if now < resume_at {
                        return AdmitDecision::RetryAfter {
                            wait: clamp_wait(resume_at - now),
                            reason: ThrottleReason::BatchCooldown,
                        };
                    }
                    state.batch_count = 0;
                    state.batch_filled_at = None;
                }
                None => {
                    state.batch_count = 0;
                }
            }
        }

        // (d) daily new-contact cap, hard deny. Only for never-contacted
        // targets; an unseeded target counts as new.
        let contacted = state
            .targets
            .get(&key)
            .map(|rec| rec.contacted)
            .unwrap_or(false);
        if !contacted {
            let cap = self.effective_daily_cap(account_age_days(account, now));
            if state.daily_new_contacts >= cap {
                return AdmitDecision::Deny {
                    reason: DenyReason::DailyCap,
                };
            }
        }

        AdmitDecision::Allow
    }

    /// Record the outcome of an attempted send. Must be called exactly once
    /// per attempt, after the outcome is known.
    pub fn record_send(
        &self,
        account: &AccountProfile,
        target: &TargetDescriptor,
        is_new_contact: bool,
    ) {
        self.record_send_at(account, target, is_new_contact, Utc::now());
    }

    /// Deterministic-time variant of [`RateGovernor::record_send`].
    pub fn record_send_at(
        &self,
        account: &AccountProfile,
        target: &TargetDescriptor,
        is_new_contact: bool,
        now: DateTime<Utc>,
    ) {
        let window = TimeDelta::seconds(self.config.window_secs as i64);

        let mut entry = self
            .accounts
            .entry(account.id.clone())
            .or_insert_with(|| RateState::new(now));
        let state = entry.value_mut();
        state.roll_day(now);
        state.prune_window(now, window);

        state.sends.push_back(now);
        state.last_send = Some(now);

        let rec = state
            .targets
            .entry(target.cache_key())
            .or_insert(TargetRecord {
                last_send: None,
                contacted: false,
            });
        rec.last_send = Some(now);
        rec.contacted = true;

        if is_new_contact {
            state.daily_new_contacts += 1;
        }

        state.batch_count += 1;
        if state.batch_count == self.config.batch_size {
            state.batch_filled_at = Some(now);
        }

        state.evict_targets(self.config.contact_cache_size);
    }

    /// Seed the ever-contacted cache from the persistent store.
    pub fn seed_contact(&self, account_id: &str, target: &TargetDescriptor, contacted: bool) {
        let mut entry = self
            .accounts
            .entry(account_id.to_string())
            .or_insert_with(|| RateState::new(Utc::now()));
        let state = entry.value_mut();
        state
            .targets
            .entry(target.cache_key())
            .and_modify(|rec| rec.contacted = rec.contacted || contacted)
            .or_insert(TargetRecord {
                last_send: None,
                contacted,
            });
        state.evict_targets(self.config.contact_cache_size);
    }

    /// Whether the contact cache already holds a record for this target.
    pub fn contact_seeded(&self, account_id: &str, target: &TargetDescriptor) -> bool {
        self.accounts
            .get(account_id)
            .map(|state| state.targets.contains_key(&target.cache_key()))
            .unwrap_or(false)
    }

    /// Whether the target counts as already contacted. Unseeded targets are
    /// new by definition.
    pub fn contact_known(&self, account_id: &str, target: &TargetDescriptor) -> bool {
        self.accounts
            .get(account_id)
            .and_then(|state| {
                state
                    .targets
                    .get(&target.cache_key())
                    .map(|rec| rec.contacted)
            })
            .unwrap_or(false)
    }

    /// Drop all cached state for an account (called on account deletion).
    pub fn forget_account(&self, account_id: &str) {
        self.accounts.remove(account_id);
    }

    /// Point-in-time stats for the account.
    pub fn stats(&self, account: &AccountProfile) -> RateStats {
        self.stats_at(account, Utc::now())
    }

    /// Deterministic-time variant of [`RateGovernor::stats`].
    pub fn stats_at(&self, account: &AccountProfile, now: DateTime<Utc>) -> RateStats {
        let window = TimeDelta::seconds(self.config.window_secs as i64);
        let age_days = account_age_days(account, now);
        let is_warmup = age_days < self.config.warmup_days;
        let daily_limit = self.effective_daily_cap(age_days);

        let (daily_used, last_minute_count, batch_count) =
            match self.accounts.get_mut(account.id.as_str()) {
                Some(mut entry) => {
                    let state = entry.value_mut();
                    state.roll_day(now);
                    state.prune_window(now, window);
                    (state.daily_new_contacts, state.sends.len(), state.batch_count)
                }
                None => (0, 0, 0),
            };

        let used_fraction = if daily_limit == 0 {
            1.0
        } else {
            f64::from(daily_used) / f64::from(daily_limit)
        };
        let risk = if used_fraction > 0.8 {
            RiskLevel::Warning
        } else if used_fraction >= 0.5 || is_warmup {
            RiskLevel::Caution
        } else {
            RiskLevel::Safe
        };

        RateStats {
            age_days,
            is_warmup,
            daily_limit,
            daily_used,
            last_minute_count,
            batch_count,
            risk,
        }
    }

    /// Daily new-contact cap for an account of the given age: the narrowest
    /// tier during warm-up, otherwise the highest tier the age qualifies for.
    fn effective_daily_cap(&self, age_days: i64) -> u32 {
        let tiers = &self.config.daily_tiers;
        if age_days < self.config.warmup_days {
            return tiers.iter().map(|t| t.cap).min().unwrap_or(0);
        }
        tiers
            .iter()
            .filter(|t| t.min_age_days <= age_days)
            .next_back()
            .map(|t| t.cap)
            .or_else(|| tiers.first().map(|t| t.cap))
            .unwrap_or(0)
    }
}

fn account_age_days(account: &AccountProfile, now: DateTime<Utc>) -> i64 {
    (now - account.created_at).num_days().max(0)
}

/// Convert a chrono delta into a std wait duration, flooring at zero.
fn clamp_wait(delta: TimeDelta) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_config::model::DailyCapTier;
    use tether_core::types::ChannelKind;

    fn profile(id: &str, age_days: i64, now: DateTime<Utc>) -> AccountProfile {
        AccountProfile {
            id: id.to_string(),
            created_at: now - TimeDelta::days(age_days),
        }
    }

    fn target(id: &str) -> TargetDescriptor {
        TargetDescriptor::contact(ChannelKind::Whatsapp, id)
    }

    fn now() -> DateTime<Utc> {
        "2026-03-01T12:00:00Z".parse().unwrap()
    }

    /// Config that isolates a single check by widening the others.
    fn wide_config() -> RateLimitConfig {
        RateLimitConfig {
            window_max_sends: 10_000,
            batch_size: 10_000,
            target_spacing_secs: 0,
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn window_cap_denies_excess_and_recovers_when_oldest_ages_out() {
        let config = RateLimitConfig {
            target_spacing_secs: 0,
            batch_size: 10_000,
            ..RateLimitConfig::default()
        };
        let governor = RateGovernor::new(config);
        let t0 = now();
        let account = profile("acc-1", 60, t0);

        // Fill the window: 15 sends one second apart to distinct targets.
        for i in 0..15 {
            let at = t0 + TimeDelta::seconds(i);
            let tgt = target(&format!("peer-{i}"));
            assert!(governor.admit_send_at(&account, &tgt, at).is_allowed());
            governor.record_send_at(&account, &tgt, true, at);
        }

        // 16th within the window is denied with the remaining wait.
        let at = t0 + TimeDelta::seconds(20);
        let decision = governor.admit_send_at(&account, &target("peer-x"), at);
        match decision {
            AdmitDecision::RetryAfter { wait, reason } => {
                assert_eq!(reason, ThrottleReason::WindowCap);
                // Oldest send was at t0; it ages out at t0+60s.
                assert_eq!(wait, Duration::from_secs(40));
            }
            other => panic!("expected window-cap retry, got {other:?}"),
        }

        // Once the oldest timestamp ages out, admission resumes.
        let at = t0 + TimeDelta::seconds(61);
        assert!(governor.admit_send_at(&account, &target("peer-x"), at).is_allowed());
    }

    #[test]
    fn same_target_spacing_denies_with_remaining_wait() {
        let governor = RateGovernor::new(wide_config_with_spacing(6));
        let t0 = now();
        let account = profile("acc-1", 60, t0);
        let tgt = target("peer-1");

        governor.record_send_at(&account, &tgt, true, t0);

        // 2s elapsed of a 6s spacing: wait ≈ 4s.
        let decision = governor.admit_send_at(&account, &tgt, t0 + TimeDelta::seconds(2));
        match decision {
            AdmitDecision::RetryAfter { wait, reason } => {
                assert_eq!(reason, ThrottleReason::TargetSpacing);
                assert_eq!(wait, Duration::from_secs(4));
            }
            other => panic!("expected spacing retry, got {other:?}"),
        }

        // A different target is not spaced.
        assert!(governor
            .admit_send_at(&account, &target("peer-2"), t0 + TimeDelta::seconds(2))
            .is_allowed());

        // After the spacing has elapsed, the same target is admitted.
        assert!(governor
            .admit_send_at(&account, &tgt, t0 + TimeDelta::seconds(6))
            .is_allowed());
    }

    fn wide_config_with_spacing(secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            window_max_sends: 10_000,
            batch_size: 10_000,
            target_spacing_secs: secs,
            ..RateLimitConfig::default()
        }
    }

    #[test]
    fn batch_cooldown_after_fifty_sends() {
        let config = RateLimitConfig {
            window_max_sends: 10_000,
            target_spacing_secs: 0,
            batch_size: 50,
            batch_cooldown_secs: 300,
            ..RateLimitConfig::default()
        };
        let governor = RateGovernor::new(config);
        let t0 = now();
        let account = profile("acc-1", 60, t0);

        // 50 recorded sends, one per second; the batch fills at t0+49s.
        for i in 0..50 {
            let tgt = target(&format!("peer-{i}"));
            governor.record_send_at(&account, &tgt, true, t0 + TimeDelta::seconds(i));
        }

        // 51st admission one second later: wait ≈ 299s.
        let at = t0 + TimeDelta::seconds(50);
        let decision = governor.admit_send_at(&account, &target("peer-x"), at);
        match decision {
            AdmitDecision::RetryAfter { wait, reason } => {
                assert_eq!(reason, ThrottleReason::BatchCooldown);
                assert_eq!(wait, Duration::from_secs(299));
            }
            other => panic!("expected batch cooldown, got {other:?}"),
        }

        // After the cooldown the batch counter resets and sends resume.
        let at = t0 + TimeDelta::seconds(49 + 300);
        assert!(governor.admit_send_at(&account, &target("peer-x"), at).is_allowed());
        let stats = governor.stats_at(&account, at);
        assert_eq!(stats.batch_count, 0);
    }

    #[test]
    fn warmup_account_gets_narrowest_tier() {
        let governor = RateGovernor::new(wide_config());
        let t0 = now();

        // Day 3 would qualify for the 60-cap tier, but warm-up pins it to 30.
        let young = profile("acc-young", 3, t0);
        let stats = governor.stats_at(&young, t0);
        assert!(stats.is_warmup);
        assert_eq!(stats.daily_limit, 30);

        // Past all tiers: the widest cap applies.
        let old = profile("acc-old", 90, t0);
        let stats = governor.stats_at(&old, t0);
        assert!(!stats.is_warmup);
        assert_eq!(stats.daily_limit, 1000);
    }

    #[test]
    fn day_zero_daily_cap_scenario() {
        let governor = RateGovernor::new(wide_config());
        let t0 = now();
        let account = profile("acc-1", 0, t0);

        // 30 new-contact sends exhaust the day-0 cap of 30.
        for i in 0..30 {
            let tgt = target(&format!("peer-{i}"));
            let at = t0 + TimeDelta::seconds(i);
            assert!(governor.admit_send_at(&account, &tgt, at).is_allowed());
            governor.record_send_at(&account, &tgt, true, at);
        }

        // The 31st new contact is hard-denied.
        let at = t0 + TimeDelta::seconds(31);
        let decision = governor.admit_send_at(&account, &target("peer-new"), at);
        assert_eq!(
            decision,
            AdmitDecision::Deny {
                reason: DenyReason::DailyCap
            }
        );

        // A send to an already-contacted target bypasses the new-contact check.
        assert!(governor.admit_send_at(&account, &target("peer-0"), at).is_allowed());
    }

    #[test]
    fn daily_counter_resets_at_utc_day_boundary() {
        let governor = RateGovernor::new(wide_config());
        let t0: DateTime<Utc> = "2026-03-01T23:59:00Z".parse().unwrap();
        let account = profile("acc-1", 10, t0);

        // 150 is the day-7+ tier cap; exhaust it.
        for i in 0..150 {
            governor.record_send_at(&account, &target(&format!("p-{i}")), true, t0);
        }
        assert_eq!(
            governor.admit_send_at(&account, &target("p-next"), t0),
            AdmitDecision::Deny {
                reason: DenyReason::DailyCap
            }
        );

        // Two minutes later it is a new UTC day.
        let next_day = t0 + TimeDelta::minutes(2);
        assert!(governor.admit_send_at(&account, &target("p-next"), next_day).is_allowed());
        assert_eq!(governor.stats_at(&account, next_day).daily_used, 0);
    }

    #[test]
    fn seeded_contact_bypasses_daily_cap() {
        let governor = RateGovernor::new(wide_config());
        let t0 = now();
        let account = profile("acc-1", 0, t0);

        for i in 0..30 {
            governor.record_send_at(&account, &target(&format!("p-{i}")), true, t0);
        }

        let returning = target("old-friend");
        assert!(!governor.contact_seeded(&account.id, &returning));
        governor.seed_contact(&account.id, &returning, true);
        assert!(governor.contact_seeded(&account.id, &returning));
        assert!(governor.admit_send_at(&account, &returning, t0).is_allowed());
    }

    #[test]
    fn unknown_account_is_lazily_initialized_not_an_error() {
        let governor = RateGovernor::new(RateLimitConfig::default());
        let t0 = now();
        let account = profile("never-seen", 60, t0);
        assert!(governor.admit_send_at(&account, &target("peer"), t0).is_allowed());
    }

    #[test]
    fn risk_levels_follow_daily_usage() {
        let governor = RateGovernor::new(wide_config());
        let t0 = now();
        let account = profile("acc-1", 60, t0); // cap 1000

        assert_eq!(governor.stats_at(&account, t0).risk, RiskLevel::Safe);

        for i in 0..500 {
            governor.record_send_at(&account, &target(&format!("p-{i}")), true, t0);
        }
        assert_eq!(governor.stats_at(&account, t0).risk, RiskLevel::Caution);

        for i in 500..801 {
            governor.record_send_at(&account, &target(&format!("p-{i}")), true, t0);
        }
        assert_eq!(governor.stats_at(&account, t0).risk, RiskLevel::Warning);
    }

    #[test]
    fn warmup_account_is_caution_even_when_idle() {
        let governor = RateGovernor::new(wide_config());
        let t0 = now();
        let account = profile("acc-1", 1, t0);
        let stats = governor.stats_at(&account, t0);
        assert!(stats.is_warmup);
        assert_eq!(stats.risk, RiskLevel::Caution);
    }

    #[test]
    fn contact_cache_evicts_oldest_beyond_bound() {
        let config = RateLimitConfig {
            contact_cache_size: 3,
            ..wide_config()
        };
        let governor = RateGovernor::new(config);
        let t0 = now();
        let account = profile("acc-1", 60, t0);

        for i in 0..5 {
            governor.record_send_at(
                &account,
                &target(&format!("p-{i}")),
                true,
                t0 + TimeDelta::seconds(i),
            );
        }

        // p-0 and p-1 were the oldest; only the newest three remain.
        assert!(!governor.contact_seeded(&account.id, &target("p-0")));
        assert!(!governor.contact_seeded(&account.id, &target("p-1")));
        assert!(governor.contact_seeded(&account.id, &target("p-4")));
    }

    #[test]
    fn custom_tier_table_is_honored() {
        let config = RateLimitConfig {
            warmup_days: 2,
            daily_tiers: vec![
                DailyCapTier { min_age_days: 0, cap: 5 },
                DailyCapTier { min_age_days: 10, cap: 50 },
            ],
            ..wide_config()
        };
        let governor = RateGovernor::new(config);
        let t0 = now();

        assert_eq!(governor.stats_at(&profile("a", 1, t0), t0).daily_limit, 5);
        assert_eq!(governor.stats_at(&profile("b", 5, t0), t0).daily_limit, 5);
        assert_eq!(governor.stats_at(&profile("c", 12, t0), t0).daily_limit, 50);
    }

    #[test]
    fn group_and_contact_targets_are_tracked_separately() {
        let governor = RateGovernor::new(wide_config_with_spacing(6));
        let t0 = now();
        let account = profile("acc-1", 60, t0);

        let contact = TargetDescriptor::contact(ChannelKind::Whatsapp, "551199");
        let group = TargetDescriptor::group(ChannelKind::Whatsapp, "551199");

        governor.record_send_at(&account, &contact, true, t0);
        // The group with the same raw id is not spacing-blocked.
        assert!(governor
            .admit_send_at(&account, &group, t0 + TimeDelta::seconds(1))
            .is_allowed());
    }
}
