//! Streak and badge engine.
//!
//! Tracks consecutive-day activity per user and awards one-time badges.
//! Days are compared as UTC calendar dates; the time of day is ignored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::badge::{BadgeKind, BadgeRuleSet};
use crate::config::GamificationConfig;
use crate::error::CoreError;
use crate::types::{Timestamp, UserId};
use crate::validation::{validate_int_range, validate_user_id};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Per-user streak and badge record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakBadgeState {
    pub user_id: UserId,
    pub earned_badges: BTreeSet<BadgeKind>,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// `None` until the first activity is recorded.
    pub last_activity_date: Option<Timestamp>,
}

impl StreakBadgeState {
    /// A fresh record with no activity and no badges.
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            earned_badges: BTreeSet::new(),
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
        }
    }

    pub fn has_badge(&self, badge: BadgeKind) -> bool {
        self.earned_badges.contains(&badge)
    }

    pub fn badge_count(&self) -> usize {
        self.earned_badges.len()
    }
}

/// How a recorded activity changed the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakChange {
    /// First activity ever recorded.
    Started,
    /// Activity on the day after the last one.
    Extended,
    /// Another activity on the same calendar day.
    SameDay,
    /// A gap of more than one day, or an activity dated before the last one.
    Reset,
}

/// Result of [`StreakEngine::record_activity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityOutcome {
    pub state: StreakBadgeState,
    pub change: StreakChange,
    /// Badges awarded by rules during this call, in rule order.
    pub newly_awarded: Vec<BadgeKind>,
}

/// Result of [`StreakEngine::award_badge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeAward {
    pub state: StreakBadgeState,
    pub already_held: bool,
}

/// Serialisable view of a streak record with its derived fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakSummary {
    pub user_id: UserId,
    pub earned_badges: BTreeSet<BadgeKind>,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_activity_date: Option<Timestamp>,
    pub badge_count: usize,
}

/// Signed number of calendar days from `from` to `to`.
pub fn calendar_days_between(from: Timestamp, to: Timestamp) -> i64 {
    (to.date_naive() - from.date_naive()).num_days()
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Applies activity events and badge awards to [`StreakBadgeState`]
/// snapshots.
#[derive(Debug)]
pub struct StreakEngine {
    rules: BadgeRuleSet,
    max_streak: u32,
}

impl StreakEngine {
    pub fn new(config: &GamificationConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self {
            rules: BadgeRuleSet::default(),
            max_streak: config.max_streak,
        })
    }

    /// Replace the badge rules evaluated after each streak change.
    pub fn with_rules(mut self, rules: BadgeRuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn rules(&self) -> &BadgeRuleSet {
        &self.rules
    }

    /// Create a record with caller-supplied initial values.
    pub fn create(
        &self,
        user_id: &str,
        earned_badges: &[BadgeKind],
        current_streak: i64,
        longest_streak: i64,
        last_activity_date: Option<Timestamp>,
        now: Timestamp,
    ) -> Result<StreakBadgeState, CoreError> {
        validate_user_id(user_id)?;

        let max = i64::from(self.max_streak);
        validate_int_range(current_streak, 0, max, "current_streak")?;
        validate_int_range(longest_streak, 0, max, "longest_streak")?;

        let badges: BTreeSet<BadgeKind> = earned_badges.iter().copied().collect();
        if badges.len() != earned_badges.len() {
            return Err(CoreError::Validation(
                "earned_badges must not contain duplicates".to_string(),
            ));
        }

        if let Some(last) = last_activity_date {
            if last > now {
                return Err(CoreError::Validation(format!(
                    "last_activity_date {last} is in the future"
                )));
            }
        }

        let state = StreakBadgeState {
            user_id: user_id.to_string(),
            earned_badges: badges,
            current_streak: current_streak as u32,
            longest_streak: longest_streak as u32,
            last_activity_date,
        };
        validate_snapshot(&state)?;
        Ok(state)
    }

    /// Record an activity dated `activity_date`.
    ///
    /// Badge rules are evaluated when an existing streak is extended or
    /// reset. The first activity only starts the streak, and a second
    /// activity on the same day only moves `last_activity_date`.
    pub fn record_activity(
        &self,
        state: &StreakBadgeState,
        activity_date: Timestamp,
    ) -> Result<ActivityOutcome, CoreError> {
        validate_snapshot(state)?;

        let mut next = state.clone();
        let change = match state.last_activity_date {
            None => {
                next.current_streak = 1;
                next.longest_streak = next.longest_streak.max(1);
                StreakChange::Started
            }
            Some(last) => match calendar_days_between(last, activity_date) {
                0 => StreakChange::SameDay,
                1 => {
                    next.current_streak = next.current_streak.saturating_add(1);
                    if next.current_streak > next.longest_streak {
                        next.longest_streak = next.current_streak;
                    }
                    StreakChange::Extended
                }
                // Out-of-order activity resets, same as a gap.
                _ => {
                    next.current_streak = 1;
                    StreakChange::Reset
                }
            },
        };
        next.last_activity_date = Some(activity_date);

        let newly_awarded = if matches!(change, StreakChange::Started | StreakChange::SameDay) {
            Vec::new()
        } else {
            let earned = self.rules.evaluate(&next);
            next.earned_badges.extend(earned.iter().copied());
            earned
        };

        ensure_streak_invariants(&next)?;

        match change {
            StreakChange::Reset => tracing::info!(
                user_id = %next.user_id,
                previous_streak = state.current_streak,
                longest_streak = next.longest_streak,
                "Streak reset"
            ),
            _ => tracing::debug!(
                user_id = %next.user_id,
                ?change,
                current_streak = next.current_streak,
                "Activity recorded"
            ),
        }
        for badge in &newly_awarded {
            tracing::info!(
                user_id = %next.user_id,
                badge = %badge,
                current_streak = next.current_streak,
                "Streak badge awarded"
            );
        }

        Ok(ActivityOutcome {
            state: next,
            change,
            newly_awarded,
        })
    }

    /// Award `badge` directly. Already-held badges leave the state untouched.
    pub fn award_badge(&self, state: &StreakBadgeState, badge: BadgeKind) -> BadgeAward {
        if state.has_badge(badge) {
            return BadgeAward {
                state: state.clone(),
                already_held: true,
            };
        }

        let mut next = state.clone();
        next.earned_badges.insert(badge);
        tracing::info!(user_id = %next.user_id, badge = %badge, "Badge awarded");

        BadgeAward {
            state: next,
            already_held: false,
        }
    }

    /// Award a badge given by its stored name.
    pub fn award_badge_named(
        &self,
        state: &StreakBadgeState,
        name: &str,
    ) -> Result<BadgeAward, CoreError> {
        let badge = BadgeKind::from_str_value(name)?;
        Ok(self.award_badge(state, badge))
    }

    pub fn has_badge(&self, state: &StreakBadgeState, badge: BadgeKind) -> bool {
        state.has_badge(badge)
    }

    pub fn badge_count(&self, state: &StreakBadgeState) -> usize {
        state.badge_count()
    }

    pub fn summarize(&self, state: &StreakBadgeState) -> StreakSummary {
        StreakSummary {
            user_id: state.user_id.clone(),
            earned_badges: state.earned_badges.clone(),
            current_streak: state.current_streak,
            longest_streak: state.longest_streak,
            last_activity_date: state.last_activity_date,
            badge_count: state.badge_count(),
        }
    }
}

impl Default for StreakEngine {
    fn default() -> Self {
        Self {
            rules: BadgeRuleSet::default(),
            max_streak: crate::config::DEFAULT_MAX_STREAK,
        }
    }
}

fn validate_snapshot(state: &StreakBadgeState) -> Result<(), CoreError> {
    if state.current_streak > state.longest_streak {
        return Err(CoreError::Validation(format!(
            "current_streak ({}) must not exceed longest_streak ({})",
            state.current_streak, state.longest_streak
        )));
    }
    Ok(())
}

fn ensure_streak_invariants(state: &StreakBadgeState) -> Result<(), CoreError> {
    if state.longest_streak < state.current_streak {
        tracing::warn!(
            user_id = %state.user_id,
            current_streak = state.current_streak,
            longest_streak = state.longest_streak,
            "Streak update produced an inconsistent state"
        );
        return Err(CoreError::InvariantViolation(format!(
            "longest_streak ({}) is below current_streak ({})",
            state.longest_streak, state.current_streak
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
