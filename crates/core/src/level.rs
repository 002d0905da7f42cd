//! Level engine: cumulative XP to a discrete level.
//!
//! Pure logic, no storage access. The caller loads a [`LevelState`], calls
//! an engine operation and persists the returned state.

use serde::{Deserialize, Serialize};

use crate::config::GamificationConfig;
use crate::error::CoreError;
use crate::types::UserId;
use crate::validation::{validate_int_range, validate_user_id};

// ---------------------------------------------------------------------------
// Threshold table
// ---------------------------------------------------------------------------

/// Minimum cumulative XP per level.
///
/// Index 0 holds level 1, which always starts at 0 XP. Thresholds are
/// strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTable {
    thresholds: Vec<u64>,
}

impl LevelTable {
    pub fn new(thresholds: Vec<u64>) -> Result<Self, CoreError> {
        match thresholds.first() {
            None => {
                return Err(CoreError::Validation(
                    "Level threshold table must not be empty".to_string(),
                ))
            }
            Some(&first) if first != 0 => {
                return Err(CoreError::Validation(format!(
                    "Level 1 threshold must be 0, got {first}"
                )))
            }
            Some(_) => {}
        }
        if let Some(pos) = thresholds.windows(2).position(|w| w[1] <= w[0]) {
            return Err(CoreError::Validation(format!(
                "Level thresholds must be strictly increasing (level {} <= level {})",
                pos + 2,
                pos + 1
            )));
        }
        Ok(Self { thresholds })
    }

    /// Highest level defined by the table.
    pub fn max_level(&self) -> u32 {
        self.thresholds.len() as u32
    }

    /// Minimum XP for `level`, or `None` if the table does not define it.
    pub fn threshold_of(&self, level: u32) -> Option<u64> {
        let index = level.checked_sub(1)?;
        self.thresholds.get(index as usize).copied()
    }

    /// The highest level whose threshold is at most `xp`.
    pub fn level_for(&self, xp: u64) -> u32 {
        self.thresholds
            .iter()
            .enumerate()
            .rev()
            .find(|&(_, &threshold)| xp >= threshold)
            .map(|(index, _)| index as u32 + 1)
            .unwrap_or(1)
    }
}

impl Default for LevelTable {
    fn default() -> Self {
        Self {
            thresholds: crate::config::DEFAULT_LEVEL_THRESHOLDS.to_vec(),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Per-user level record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    pub user_id: UserId,
    pub current_xp: u64,
    pub current_level: u32,
}

impl LevelState {
    /// A fresh record at 0 XP and level 1.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            current_xp: 0,
            current_level: 1,
        }
    }
}

/// Result of [`LevelEngine::add_xp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpAward {
    pub state: LevelState,
    pub previous_level: u32,
    pub leveled_up: bool,
    pub levels_gained: u32,
    /// Signed change from `previous_level`. Negative only when the input
    /// record carried a level its XP did not support, e.g. after
    /// [`LevelEngine::set_state`].
    pub level_delta: i64,
}

/// Serialisable view of a level record with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub user_id: UserId,
    pub current_xp: u64,
    pub current_level: u32,
    pub xp_to_next_level: u64,
    pub progress_percentage: f64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies XP events to [`LevelState`] snapshots.
#[derive(Debug, Clone)]
pub struct LevelEngine {
    table: LevelTable,
    max_xp_award: u64,
    max_total_xp: u64,
}

impl LevelEngine {
    pub fn new(config: &GamificationConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            table: config.level_table()?,
            max_xp_award: config.max_xp_award,
            max_total_xp: config.max_total_xp,
        })
    }

    pub fn table(&self) -> &LevelTable {
        &self.table
    }

    /// Create a record with caller-supplied initial values.
    ///
    /// The level is taken as given, like [`set_state`](Self::set_state).
    pub fn create(
        &self,
        user_id: &str,
        initial_xp: i64,
        initial_level: i64,
    ) -> Result<LevelState, CoreError> {
        validate_user_id(user_id)?;
        let (current_xp, current_level) = self.validate_absolute(initial_xp, initial_level)?;
        Ok(LevelState {
            user_id: user_id.to_string(),
            current_xp,
            current_level,
        })
    }

    /// Add `amount` XP and re-derive the level from the new total.
    pub fn add_xp(&self, state: &LevelState, amount: i64) -> Result<XpAward, CoreError> {
        validate_int_range(amount, 1, cap_as_i64(self.max_xp_award), "XP amount")?;

        let current_xp = state.current_xp.checked_add(amount as u64).ok_or_else(|| {
            CoreError::Validation(format!(
                "XP amount {amount} would overflow the XP counter"
            ))
        })?;
        let current_level = self.table.level_for(current_xp);

        let next = LevelState {
            user_id: state.user_id.clone(),
            current_xp,
            current_level,
        };
        self.ensure_consistent(state, &next)?;

        let previous_level = state.current_level;
        let leveled_up = current_level > previous_level;
        let levels_gained = current_level.saturating_sub(previous_level);
        let level_delta = i64::from(current_level) - i64::from(previous_level);

        tracing::debug!(
            user_id = %next.user_id,
            amount,
            current_xp,
            "XP added"
        );
        if leveled_up {
            tracing::info!(
                user_id = %next.user_id,
                from_level = previous_level,
                to_level = current_level,
                "User leveled up"
            );
        } else if level_delta < 0 {
            tracing::warn!(
                user_id = %next.user_id,
                from_level = previous_level,
                to_level = current_level,
                current_xp,
                "Level re-derived below the stored level"
            );
        }

        Ok(XpAward {
            state: next,
            previous_level,
            leveled_up,
            levels_gained,
            level_delta,
        })
    }

    /// Administrative overwrite of both XP and level.
    ///
    /// The level is stored as supplied and is not re-derived from the XP, so
    /// the result may not satisfy [`is_consistent`](Self::is_consistent).
    pub fn set_state(
        &self,
        state: &LevelState,
        xp: i64,
        level: i64,
    ) -> Result<LevelState, CoreError> {
        let (current_xp, current_level) = self.validate_absolute(xp, level)?;
        let next = LevelState {
            user_id: state.user_id.clone(),
            current_xp,
            current_level,
        };
        if !self.is_consistent(&next) {
            tracing::debug!(
                user_id = %next.user_id,
                current_xp,
                current_level,
                derived_level = self.table.level_for(current_xp),
                "Level overwritten without matching XP"
            );
        }
        Ok(next)
    }

    /// XP still needed to reach the next level; 0 at the top level.
    pub fn xp_to_next_level(&self, state: &LevelState) -> u64 {
        match self.table.threshold_of(state.current_level.saturating_add(1)) {
            Some(next) => next.saturating_sub(state.current_xp),
            None => 0,
        }
    }

    /// Progress through the current level in `[0, 100]`; 100 at the top level.
    pub fn progress_percentage(&self, state: &LevelState) -> f64 {
        let (Some(floor), Some(ceiling)) = (
            self.table.threshold_of(state.current_level),
            self.table.threshold_of(state.current_level.saturating_add(1)),
        ) else {
            return 100.0;
        };
        let earned = state.current_xp as f64 - floor as f64;
        let span = (ceiling - floor) as f64;
        (earned / span * 100.0).clamp(0.0, 100.0)
    }

    /// Whether the stored level matches the level derived from the XP.
    pub fn is_consistent(&self, state: &LevelState) -> bool {
        state.current_level == self.table.level_for(state.current_xp)
    }

    pub fn summarize(&self, state: &LevelState) -> LevelSummary {
        LevelSummary {
            user_id: state.user_id.clone(),
            current_xp: state.current_xp,
            current_level: state.current_level,
            xp_to_next_level: self.xp_to_next_level(state),
            progress_percentage: self.progress_percentage(state),
        }
    }

    fn validate_absolute(&self, xp: i64, level: i64) -> Result<(u64, u32), CoreError> {
        validate_int_range(xp, 0, cap_as_i64(self.max_total_xp), "XP")?;
        validate_int_range(level, 1, i64::from(self.table.max_level()), "level")?;
        Ok((xp as u64, level as u32))
    }

    fn ensure_consistent(&self, before: &LevelState, after: &LevelState) -> Result<(), CoreError> {
        if after.current_xp < before.current_xp || !self.is_consistent(after) {
            tracing::warn!(
                user_id = %after.user_id,
                current_xp = after.current_xp,
                current_level = after.current_level,
                "Level update produced an inconsistent state"
            );
            return Err(CoreError::InvariantViolation(format!(
                "level {} does not match {} XP",
                after.current_level, after.current_xp
            )));
        }
        Ok(())
    }
}

/// Caps above `i64::MAX` saturate. [`GamificationConfig::validate`] already
/// rejects them.
fn cap_as_i64(cap: u64) -> i64 {
    i64::try_from(cap).unwrap_or(i64::MAX)
}

impl Default for LevelEngine {
    fn default() -> Self {
        Self {
            table: LevelTable::default(),
            max_xp_award: crate::config::DEFAULT_MAX_XP_AWARD,
            max_total_xp: crate::config::DEFAULT_MAX_TOTAL_XP,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
