// SPDX-FileCopyrightText: 2026 Tether Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes: non-zero rate knobs, a well-formed daily cap tier table, and
//! a non-empty database path.

use crate::diagnostic::ConfigError;
use crate::model::TetherConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TetherConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.rate.window_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "rate.window_secs must be greater than zero".to_string(),
        });
    }

    if config.rate.window_max_sends == 0 {
        errors.push(ConfigError::Validation {
            message: "rate.window_max_sends must be greater than zero".to_string(),
        });
    }

    if config.rate.batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "rate.batch_size must be greater than zero".to_string(),
        });
    }

    if config.rate.warmup_days < 0 {
        errors.push(ConfigError::Validation {
            message: format!(
                "rate.warmup_days must be non-negative, got {}",
                config.rate.warmup_days
            ),
        });
    }

    // The tier table must start at age 0 and ascend, otherwise cap lookup
    // by account age is ambiguous.
    if config.rate.daily_tiers.is_empty() {
        errors.push(ConfigError::Validation {
            message: "rate.daily_tiers must not be empty".to_string(),
        });
    } else {
        if config.rate.daily_tiers[0].min_age_days != 0 {
            errors.push(ConfigError::Validation {
                message: "rate.daily_tiers must start with a min_age_days = 0 tier"
                    .to_string(),
            });
        }
        for pair in config.rate.daily_tiers.windows(2) {
            if pair[1].min_age_days <= pair[0].min_age_days {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "rate.daily_tiers must ascend by min_age_days: {} follows {}",
                        pair[1].min_age_days, pair[0].min_age_days
                    ),
                });
            }
        }
    }

    if config.session.reconcile_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.reconcile_interval_secs must be greater than zero".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if let Some(command) = &config.bridge.command
        && command.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "bridge.command must not be empty when set".to_string(),
        });
    }

    if config.bridge.send_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "bridge.send_timeout_secs must be greater than zero".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DailyCapTier;

    #[test]
    fn default_config_validates() {
        let config = TetherConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TetherConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn zero_window_cap_fails_validation() {
        let mut config = TetherConfig::default();
        config.rate.window_max_sends = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("window_max_sends"))));
    }

    #[test]
    fn tier_table_must_start_at_zero() {
        let mut config = TetherConfig::default();
        config.rate.daily_tiers = vec![DailyCapTier { min_age_days: 3, cap: 60 }];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("min_age_days = 0"))));
    }

    #[test]
    fn tier_table_must_ascend() {
        let mut config = TetherConfig::default();
        config.rate.daily_tiers = vec![
            DailyCapTier { min_age_days: 0, cap: 30 },
            DailyCapTier { min_age_days: 14, cap: 300 },
            DailyCapTier { min_age_days: 7, cap: 150 },
        ];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("ascend"))));
    }

    #[test]
    fn errors_are_collected_not_fail_fast() {
        let mut config = TetherConfig::default();
        config.rate.window_max_sends = 0;
        config.rate.batch_size = 0;
        config.storage.database_path = " ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
