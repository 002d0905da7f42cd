//! Engine configuration loaded from environment variables.

use std::str::FromStr;

use crate::error::CoreError;
use crate::level::LevelTable;

/// Default XP thresholds, indexed by `level - 1`.
pub const DEFAULT_LEVEL_THRESHOLDS: &[u64] = &[0, 100, 250, 500, 1000];

/// Largest XP amount accepted by a single award.
pub const DEFAULT_MAX_XP_AWARD: u64 = 10_000;

/// Largest absolute XP value accepted at creation or by an overwrite.
pub const DEFAULT_MAX_TOTAL_XP: u64 = 1_000_000;

/// Largest streak value accepted at creation.
pub const DEFAULT_MAX_STREAK: u32 = 10_000;

/// Largest single milestone progress increment.
pub const DEFAULT_MAX_PROGRESS_DELTA: f64 = 100_000.0;

/// Largest milestone target or absolute progress value.
pub const DEFAULT_MAX_MILESTONE_VALUE: f64 = 1_000_000.0;

/// A milestone may be created with at most this multiple of its target.
pub const DEFAULT_MAX_OVERSHOOT_FACTOR: f64 = 2.0;

/// Tunables shared by the three engines.
///
/// [`Default`] reproduces the production constants. Override them via
/// [`GamificationConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct GamificationConfig {
    /// Minimum cumulative XP per level; index 0 is level 1.
    pub level_thresholds: Vec<u64>,
    pub max_xp_award: u64,
    pub max_total_xp: u64,
    pub max_streak: u32,
    pub max_progress_delta: f64,
    pub max_milestone_value: f64,
    pub max_overshoot_factor: f64,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            level_thresholds: DEFAULT_LEVEL_THRESHOLDS.to_vec(),
            max_xp_award: DEFAULT_MAX_XP_AWARD,
            max_total_xp: DEFAULT_MAX_TOTAL_XP,
            max_streak: DEFAULT_MAX_STREAK,
            max_progress_delta: DEFAULT_MAX_PROGRESS_DELTA,
            max_milestone_value: DEFAULT_MAX_MILESTONE_VALUE,
            max_overshoot_factor: DEFAULT_MAX_OVERSHOOT_FACTOR,
        }
    }
}

impl GamificationConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                             | Default              |
    /// |-------------------------------------|----------------------|
    /// | `GAMIFICATION_LEVEL_THRESHOLDS`     | `0,100,250,500,1000` |
    /// | `GAMIFICATION_MAX_XP_AWARD`         | `10000`              |
    /// | `GAMIFICATION_MAX_TOTAL_XP`         | `1000000`            |
    /// | `GAMIFICATION_MAX_STREAK`           | `10000`              |
    /// | `GAMIFICATION_MAX_PROGRESS_DELTA`   | `100000`             |
    /// | `GAMIFICATION_MAX_MILESTONE_VALUE`  | `1000000`            |
    /// | `GAMIFICATION_MAX_OVERSHOOT_FACTOR` | `2.0`                |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset keys fall back to defaults; unparseable values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let level_thresholds = match lookup("GAMIFICATION_LEVEL_THRESHOLDS") {
            Some(raw) => parse_thresholds(&raw)?,
            None => defaults.level_thresholds,
        };

        let config = Self {
            level_thresholds,
            max_xp_award: parse_var(&lookup, "GAMIFICATION_MAX_XP_AWARD", defaults.max_xp_award)?,
            max_total_xp: parse_var(&lookup, "GAMIFICATION_MAX_TOTAL_XP", defaults.max_total_xp)?,
            max_streak: parse_var(&lookup, "GAMIFICATION_MAX_STREAK", defaults.max_streak)?,
            max_progress_delta: parse_var(
                &lookup,
                "GAMIFICATION_MAX_PROGRESS_DELTA",
                defaults.max_progress_delta,
            )?,
            max_milestone_value: parse_var(
                &lookup,
                "GAMIFICATION_MAX_MILESTONE_VALUE",
                defaults.max_milestone_value,
            )?,
            max_overshoot_factor: parse_var(
                &lookup,
                "GAMIFICATION_MAX_OVERSHOOT_FACTOR",
                defaults.max_overshoot_factor,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check the threshold table and that every cap is positive. XP caps
    /// must also fit in an `i64`, the type callers pass amounts as.
    pub fn validate(&self) -> Result<(), CoreError> {
        LevelTable::new(self.level_thresholds.clone())?;

        if self.max_xp_award == 0 || self.max_total_xp == 0 || self.max_streak == 0 {
            return Err(CoreError::Validation(
                "XP and streak caps must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("max_xp_award", self.max_xp_award),
            ("max_total_xp", self.max_total_xp),
        ] {
            if i64::try_from(value).is_err() {
                return Err(CoreError::Validation(format!(
                    "{name} must be at most {}, got {value}",
                    i64::MAX
                )));
            }
        }
        for (name, value) in [
            ("max_progress_delta", self.max_progress_delta),
            ("max_milestone_value", self.max_milestone_value),
            ("max_overshoot_factor", self.max_overshoot_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(CoreError::Validation(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Build the level table. Fails only if the thresholds were edited
    /// after validation.
    pub fn level_table(&self) -> Result<LevelTable, CoreError> {
        LevelTable::new(self.level_thresholds.clone())
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, CoreError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            CoreError::Validation(format!("{key} has an invalid value '{raw}'"))
        }),
        None => Ok(default),
    }
}

fn parse_thresholds(raw: &str) -> Result<Vec<u64>, CoreError> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map_err(|_| {
                CoreError::Validation(format!(
                    "GAMIFICATION_LEVEL_THRESHOLDS contains an invalid value '{s}'"
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = GamificationConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, GamificationConfig::default());
        assert_eq!(config.level_thresholds, vec![0, 100, 250, 500, 1000]);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = GamificationConfig::from_lookup(lookup_from(&[
            ("GAMIFICATION_LEVEL_THRESHOLDS", "0, 50, 200"),
            ("GAMIFICATION_MAX_XP_AWARD", "500"),
            ("GAMIFICATION_MAX_PROGRESS_DELTA", "42.5"),
        ]))
        .unwrap();
        assert_eq!(config.level_thresholds, vec![0, 50, 200]);
        assert_eq!(config.max_xp_award, 500);
        assert_eq!(config.max_progress_delta, 42.5);
        assert_eq!(config.max_streak, DEFAULT_MAX_STREAK);
    }

    #[test]
    fn unparseable_value_is_rejected() {
        let result = GamificationConfig::from_lookup(lookup_from(&[(
            "GAMIFICATION_MAX_STREAK",
            "forever",
        )]));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("GAMIFICATION_MAX_STREAK"));
    }

    #[test]
    fn non_increasing_thresholds_are_rejected() {
        let result = GamificationConfig::from_lookup(lookup_from(&[(
            "GAMIFICATION_LEVEL_THRESHOLDS",
            "0,100,100",
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn zero_caps_are_rejected() {
        let config = GamificationConfig {
            max_xp_award: 0,
            ..GamificationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GamificationConfig {
            max_overshoot_factor: f64::NAN,
            ..GamificationConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn xp_caps_beyond_i64_are_rejected() {
        let err = GamificationConfig::from_lookup(lookup_from(&[(
            "GAMIFICATION_MAX_XP_AWARD",
            "18446744073709551615",
        )]))
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(err.to_string().contains("max_xp_award"));

        let config = GamificationConfig {
            max_total_xp: i64::MAX as u64 + 1,
            ..GamificationConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GamificationConfig {
            max_total_xp: i64::MAX as u64,
            ..GamificationConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
