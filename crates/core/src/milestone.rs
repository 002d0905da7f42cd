//! Milestone engine: progress of a numeric goal toward a target.
//!
//! Completion is sticky. A milestone completes the first time its value
//! reaches the target and stays completed even if the value is later set
//! below the target.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::config::GamificationConfig;
use crate::error::CoreError;
use crate::types::{MilestoneId, Timestamp, UserId};
use crate::validation::{
    unknown_key, validate_finite_range, validate_positive_finite, validate_user_id,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MILESTONE_WEIGHT_LOSS: &str = "WEIGHT_LOSS";
pub const MILESTONE_WEIGHT_GAIN: &str = "WEIGHT_GAIN";
pub const MILESTONE_WORKOUT_COUNT: &str = "WORKOUT_COUNT";
pub const MILESTONE_DISTANCE_RUN: &str = "DISTANCE_RUN";
pub const MILESTONE_CALORIES_BURNED: &str = "CALORIES_BURNED";
pub const MILESTONE_DAYS_ACTIVE: &str = "DAYS_ACTIVE";
pub const MILESTONE_GOAL_REACHED: &str = "GOAL_REACHED";
pub const MILESTONE_PERSONAL_BEST: &str = "PERSONAL_BEST";

/// All valid milestone kind strings.
pub const VALID_MILESTONE_KINDS: &[&str] = &[
    MILESTONE_WEIGHT_LOSS,
    MILESTONE_WEIGHT_GAIN,
    MILESTONE_WORKOUT_COUNT,
    MILESTONE_DISTANCE_RUN,
    MILESTONE_CALORIES_BURNED,
    MILESTONE_DAYS_ACTIVE,
    MILESTONE_GOAL_REACHED,
    MILESTONE_PERSONAL_BEST,
];

// ---------------------------------------------------------------------------
// MilestoneKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneKind {
    /// Pounds lost.
    WeightLoss,
    /// Pounds gained.
    WeightGain,
    WorkoutCount,
    /// Miles run in total.
    DistanceRun,
    CaloriesBurned,
    DaysActive,
    /// Weight or activity goal reached.
    GoalReached,
    /// Personal best in an exercise.
    PersonalBest,
}

impl MilestoneKind {
    /// Convert from the stored string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            MILESTONE_WEIGHT_LOSS => Ok(Self::WeightLoss),
            MILESTONE_WEIGHT_GAIN => Ok(Self::WeightGain),
            MILESTONE_WORKOUT_COUNT => Ok(Self::WorkoutCount),
            MILESTONE_DISTANCE_RUN => Ok(Self::DistanceRun),
            MILESTONE_CALORIES_BURNED => Ok(Self::CaloriesBurned),
            MILESTONE_DAYS_ACTIVE => Ok(Self::DaysActive),
            MILESTONE_GOAL_REACHED => Ok(Self::GoalReached),
            MILESTONE_PERSONAL_BEST => Ok(Self::PersonalBest),
            _ => Err(unknown_key(s, VALID_MILESTONE_KINDS, "milestone kind")),
        }
    }

    /// Convert to the stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WeightLoss => MILESTONE_WEIGHT_LOSS,
            Self::WeightGain => MILESTONE_WEIGHT_GAIN,
            Self::WorkoutCount => MILESTONE_WORKOUT_COUNT,
            Self::DistanceRun => MILESTONE_DISTANCE_RUN,
            Self::CaloriesBurned => MILESTONE_CALORIES_BURNED,
            Self::DaysActive => MILESTONE_DAYS_ACTIVE,
            Self::GoalReached => MILESTONE_GOAL_REACHED,
            Self::PersonalBest => MILESTONE_PERSONAL_BEST,
        }
    }
}

impl FromStr for MilestoneKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_value(s)
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Input for [`MilestoneEngine::create`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub target_value: f64,
    #[serde(default)]
    pub current_value: f64,
}

impl NewMilestone {
    /// A milestone starting from zero progress.
    pub fn new(user_id: impl Into<UserId>, kind: MilestoneKind, target_value: f64) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            target_value,
            current_value: 0.0,
        }
    }
}

/// A user-defined numeric goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneRecord {
    pub milestone_id: MilestoneId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub target_value: f64,
    pub current_value: f64,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Result of a progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressOutcome {
    pub record: MilestoneRecord,
    /// Whether this update moved the milestone to completed.
    pub completed_now: bool,
}

/// Serialisable view of a milestone with its derived fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneSummary {
    pub milestone_id: MilestoneId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub target_value: f64,
    pub current_value: f64,
    pub is_completed: bool,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub progress_percentage: f64,
    pub remaining: f64,
}

/// Counts across a set of milestones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRollup {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies progress updates to [`MilestoneRecord`] snapshots.
#[derive(Debug, Clone)]
pub struct MilestoneEngine {
    max_progress_delta: f64,
    max_milestone_value: f64,
    max_overshoot_factor: f64,
}

impl MilestoneEngine {
    pub fn new(config: &GamificationConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            max_progress_delta: config.max_progress_delta,
            max_milestone_value: config.max_milestone_value,
            max_overshoot_factor: config.max_overshoot_factor,
        })
    }

    /// Create a milestone with a fresh id, stamped `now`.
    ///
    /// New records always start incomplete, even when the initial value is
    /// already at the target. Completion is stamped by the first progress
    /// update.
    pub fn create(
        &self,
        new: &NewMilestone,
        now: Timestamp,
    ) -> Result<MilestoneRecord, CoreError> {
        validate_user_id(&new.user_id)?;
        validate_positive_finite(new.target_value, self.max_milestone_value, "target_value")?;
        validate_finite_range(
            new.current_value,
            0.0,
            self.max_milestone_value,
            "current_value",
        )?;
        let max_initial = new.target_value * self.max_overshoot_factor;
        if new.current_value > max_initial {
            return Err(CoreError::Validation(format!(
                "current_value {} exceeds {max_initial} ({}x target_value)",
                new.current_value, self.max_overshoot_factor
            )));
        }

        let record = MilestoneRecord {
            milestone_id: MilestoneId::now_v7(),
            user_id: new.user_id.clone(),
            kind: new.kind,
            target_value: new.target_value,
            current_value: new.current_value,
            is_completed: false,
            completed_at: None,
            created_at: now,
        };
        tracing::debug!(
            milestone_id = %record.milestone_id,
            user_id = %record.user_id,
            kind = %record.kind,
            target_value = record.target_value,
            "Milestone created"
        );
        Ok(record)
    }

    /// Add `delta` to the current value.
    pub fn add_progress(
        &self,
        record: &MilestoneRecord,
        delta: f64,
    ) -> Result<ProgressOutcome, CoreError> {
        self.add_progress_at(record, delta, Utc::now())
    }

    /// [`add_progress`](Self::add_progress) with an explicit clock.
    pub fn add_progress_at(
        &self,
        record: &MilestoneRecord,
        delta: f64,
        now: Timestamp,
    ) -> Result<ProgressOutcome, CoreError> {
        validate_positive_finite(delta, self.max_progress_delta, "progress delta")?;
        validate_snapshot(record)?;

        let mut next = record.clone();
        next.current_value += delta;
        tracing::debug!(
            milestone_id = %next.milestone_id,
            delta,
            current_value = next.current_value,
            "Milestone progress added"
        );
        self.finish_update(record, next, now)
    }

    /// Replace the current value with `new_value`.
    pub fn set_progress(
        &self,
        record: &MilestoneRecord,
        new_value: f64,
    ) -> Result<ProgressOutcome, CoreError> {
        self.set_progress_at(record, new_value, Utc::now())
    }

    /// [`set_progress`](Self::set_progress) with an explicit clock.
    pub fn set_progress_at(
        &self,
        record: &MilestoneRecord,
        new_value: f64,
        now: Timestamp,
    ) -> Result<ProgressOutcome, CoreError> {
        validate_finite_range(new_value, 0.0, self.max_milestone_value, "progress value")?;
        validate_snapshot(record)?;

        let mut next = record.clone();
        next.current_value = new_value;
        tracing::debug!(
            milestone_id = %next.milestone_id,
            current_value = new_value,
            "Milestone progress set"
        );
        self.finish_update(record, next, now)
    }

    /// `current / target` as a percentage in `[0, 100]`.
    pub fn progress_percentage(&self, record: &MilestoneRecord) -> f64 {
        if record.target_value <= 0.0 {
            return 0.0;
        }
        (record.current_value / record.target_value * 100.0).clamp(0.0, 100.0)
    }

    /// Amount still needed to reach the target; never negative.
    pub fn remaining(&self, record: &MilestoneRecord) -> f64 {
        (record.target_value - record.current_value).max(0.0)
    }

    pub fn summarize(&self, record: &MilestoneRecord) -> MilestoneSummary {
        MilestoneSummary {
            milestone_id: record.milestone_id,
            user_id: record.user_id.clone(),
            kind: record.kind,
            target_value: record.target_value,
            current_value: record.current_value,
            is_completed: record.is_completed,
            completed_at: record.completed_at,
            created_at: record.created_at,
            progress_percentage: self.progress_percentage(record),
            remaining: self.remaining(record),
        }
    }

    /// Completion counts across a user's milestones.
    pub fn summarize_all(&self, records: &[MilestoneRecord]) -> MilestoneRollup {
        let completed = records.iter().filter(|r| r.is_completed).count();
        MilestoneRollup {
            total: records.len(),
            completed,
            in_progress: records.len() - completed,
        }
    }

    /// Apply the completion transition and check the output invariants.
    fn finish_update(
        &self,
        before: &MilestoneRecord,
        mut next: MilestoneRecord,
        now: Timestamp,
    ) -> Result<ProgressOutcome, CoreError> {
        let completed_now = !next.is_completed && next.current_value >= next.target_value;
        if completed_now {
            next.is_completed = true;
            next.completed_at = Some(now);
            tracing::info!(
                milestone_id = %next.milestone_id,
                user_id = %next.user_id,
                kind = %next.kind,
                target_value = next.target_value,
                "Milestone completed"
            );
        }

        ensure_milestone_invariants(before, &next)?;
        Ok(ProgressOutcome {
            record: next,
            completed_now,
        })
    }
}

impl Default for MilestoneEngine {
    fn default() -> Self {
        Self {
            max_progress_delta: crate::config::DEFAULT_MAX_PROGRESS_DELTA,
            max_milestone_value: crate::config::DEFAULT_MAX_MILESTONE_VALUE,
            max_overshoot_factor: crate::config::DEFAULT_MAX_OVERSHOOT_FACTOR,
        }
    }
}

fn validate_snapshot(record: &MilestoneRecord) -> Result<(), CoreError> {
    if !record.target_value.is_finite() || record.target_value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "target_value must be a positive finite number, got {}",
            record.target_value
        )));
    }
    if !record.current_value.is_finite() || record.current_value < 0.0 {
        return Err(CoreError::Validation(format!(
            "current_value must be a non-negative finite number, got {}",
            record.current_value
        )));
    }
    if record.is_completed != record.completed_at.is_some() {
        return Err(CoreError::Validation(
            "is_completed and completed_at disagree".to_string(),
        ));
    }
    Ok(())
}

fn ensure_milestone_invariants(
    before: &MilestoneRecord,
    after: &MilestoneRecord,
) -> Result<(), CoreError> {
    let problem = if after.is_completed != after.completed_at.is_some() {
        Some("is_completed and completed_at disagree")
    } else if before.is_completed && !after.is_completed {
        Some("completed milestone reverted to incomplete")
    } else if !after.current_value.is_finite() {
        Some("current_value is not finite")
    } else {
        None
    };

    match problem {
        Some(reason) => {
            tracing::warn!(
                milestone_id = %after.milestone_id,
                reason,
                "Milestone update produced an inconsistent state"
            );
            Err(CoreError::InvariantViolation(reason.to_string()))
        }
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
