//! Badge kinds and the rules that award them.
//!
//! Badges are a closed set; adding one means adding a variant here and, if
//! it is earned automatically, a rule in [`BadgeRuleSet`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::streak::StreakBadgeState;
use crate::validation::unknown_key;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const BADGE_STREAK_MASTER: &str = "STREAK_MASTER";
pub const BADGE_WEEKLY_WARRIOR: &str = "WEEKLY_WARRIOR";
pub const BADGE_MILESTONE_ACHIEVER: &str = "MILESTONE_ACHIEVER";
pub const BADGE_GOAL_CRUSHER: &str = "GOAL_CRUSHER";
pub const BADGE_LEVEL_LEGEND: &str = "LEVEL_LEGEND";
pub const BADGE_CONSISTENCY_KING: &str = "CONSISTENCY_KING";
pub const BADGE_FIRST_STEPS: &str = "FIRST_STEPS";
pub const BADGE_CENTURY_CLUB: &str = "CENTURY_CLUB";

/// All valid badge kind strings.
pub const VALID_BADGE_KINDS: &[&str] = &[
    BADGE_STREAK_MASTER,
    BADGE_WEEKLY_WARRIOR,
    BADGE_MILESTONE_ACHIEVER,
    BADGE_GOAL_CRUSHER,
    BADGE_LEVEL_LEGEND,
    BADGE_CONSISTENCY_KING,
    BADGE_FIRST_STEPS,
    BADGE_CENTURY_CLUB,
];

/// Streak length that earns [`BadgeKind::StreakMaster`].
pub const STREAK_MASTER_DAYS: u32 = 10;

/// Streak length that earns [`BadgeKind::ConsistencyKing`].
pub const CONSISTENCY_KING_DAYS: u32 = 30;

// ---------------------------------------------------------------------------
// BadgeKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeKind {
    /// Streak of ten days or more.
    StreakMaster,
    /// Activity on every day of a week.
    WeeklyWarrior,
    MilestoneAchiever,
    GoalCrusher,
    /// Reached a headline level.
    LevelLegend,
    /// Streak of thirty days or more.
    ConsistencyKing,
    /// First completed workout.
    FirstSteps,
    /// One hundred workouts in total.
    CenturyClub,
}

impl BadgeKind {
    /// Convert from the stored string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            BADGE_STREAK_MASTER => Ok(Self::StreakMaster),
            BADGE_WEEKLY_WARRIOR => Ok(Self::WeeklyWarrior),
            BADGE_MILESTONE_ACHIEVER => Ok(Self::MilestoneAchiever),
            BADGE_GOAL_CRUSHER => Ok(Self::GoalCrusher),
            BADGE_LEVEL_LEGEND => Ok(Self::LevelLegend),
            BADGE_CONSISTENCY_KING => Ok(Self::ConsistencyKing),
            BADGE_FIRST_STEPS => Ok(Self::FirstSteps),
            BADGE_CENTURY_CLUB => Ok(Self::CenturyClub),
            _ => Err(unknown_key(s, VALID_BADGE_KINDS, "badge kind")),
        }
    }

    /// Convert to the stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreakMaster => BADGE_STREAK_MASTER,
            Self::WeeklyWarrior => BADGE_WEEKLY_WARRIOR,
            Self::MilestoneAchiever => BADGE_MILESTONE_ACHIEVER,
            Self::GoalCrusher => BADGE_GOAL_CRUSHER,
            Self::LevelLegend => BADGE_LEVEL_LEGEND,
            Self::ConsistencyKing => BADGE_CONSISTENCY_KING,
            Self::FirstSteps => BADGE_FIRST_STEPS,
            Self::CenturyClub => BADGE_CENTURY_CLUB,
        }
    }
}

impl FromStr for BadgeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_value(s)
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A condition that automatically awards a badge after a streak change.
///
/// Implementations must be pure: the same state always yields the same
/// answer.
pub trait BadgeRule: fmt::Debug + Send + Sync {
    /// The badge this rule awards.
    fn badge(&self) -> BadgeKind;

    /// Whether `state` qualifies for the badge.
    fn is_satisfied(&self, state: &StreakBadgeState) -> bool;
}

/// Awards a badge once the current streak reaches `min_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakThresholdRule {
    pub min_days: u32,
    pub badge: BadgeKind,
}

impl StreakThresholdRule {
    pub const fn new(min_days: u32, badge: BadgeKind) -> Self {
        Self { min_days, badge }
    }
}

impl BadgeRule for StreakThresholdRule {
    fn badge(&self) -> BadgeKind {
        self.badge
    }

    fn is_satisfied(&self, state: &StreakBadgeState) -> bool {
        state.current_streak >= self.min_days
    }
}

/// Ordered list of rules evaluated after every streak change.
#[derive(Debug)]
pub struct BadgeRuleSet {
    rules: Vec<Box<dyn BadgeRule>>,
}

impl BadgeRuleSet {
    /// A rule set with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule; rules run in insertion order.
    pub fn with_rule(mut self, rule: impl BadgeRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Badges whose rule is satisfied by `state` and that it does not hold
    /// yet, in rule order and without duplicates.
    pub fn evaluate(&self, state: &StreakBadgeState) -> Vec<BadgeKind> {
        let mut earned: Vec<BadgeKind> = Vec::new();
        for rule in &self.rules {
            let badge = rule.badge();
            if !state.earned_badges.contains(&badge)
                && !earned.contains(&badge)
                && rule.is_satisfied(state)
            {
                earned.push(badge);
            }
        }
        earned
    }
}

impl Default for BadgeRuleSet {
    fn default() -> Self {
        Self::empty()
            .with_rule(StreakThresholdRule::new(
                STREAK_MASTER_DAYS,
                BadgeKind::StreakMaster,
            ))
            .with_rule(StreakThresholdRule::new(
                CONSISTENCY_KING_DAYS,
                BadgeKind::ConsistencyKing,
            ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use assert_matches::assert_matches;

    use super::*;

    fn streak_state(current: u32, earned: &[BadgeKind]) -> StreakBadgeState {
        StreakBadgeState {
            user_id: "user-1".to_string(),
            earned_badges: earned.iter().copied().collect::<BTreeSet<_>>(),
            current_streak: current,
            longest_streak: current,
            last_activity_date: None,
        }
    }

    #[test]
    fn all_badge_kinds_round_trip_through_strings() {
        for value in VALID_BADGE_KINDS {
            let kind = BadgeKind::from_str_value(value).unwrap();
            assert_eq!(kind.as_str(), *value);
        }
    }

    #[test]
    fn unknown_badge_kind_is_rejected() {
        let err = BadgeKind::from_str("TOP_DOG").unwrap_err();
        assert_matches!(err, CoreError::Validation(_));
        assert!(err.to_string().contains("Unknown badge kind 'TOP_DOG'"));
        assert!("streak_master".parse::<BadgeKind>().is_err());
    }

    #[test]
    fn badge_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&BadgeKind::ConsistencyKing).unwrap();
        assert_eq!(json, "\"CONSISTENCY_KING\"");
        let kind: BadgeKind = serde_json::from_str("\"FIRST_STEPS\"").unwrap();
        assert_eq!(kind, BadgeKind::FirstSteps);
    }

    #[test]
    fn default_rules_follow_streak_thresholds() {
        let rules = BadgeRuleSet::default();
        assert_eq!(rules.len(), 2);
        assert!(rules.evaluate(&streak_state(9, &[])).is_empty());
        assert_eq!(
            rules.evaluate(&streak_state(10, &[])),
            vec![BadgeKind::StreakMaster]
        );
        assert_eq!(
            rules.evaluate(&streak_state(30, &[])),
            vec![BadgeKind::StreakMaster, BadgeKind::ConsistencyKing]
        );
    }

    #[test]
    fn held_badges_are_not_awarded_again() {
        let rules = BadgeRuleSet::default();
        assert_eq!(
            rules.evaluate(&streak_state(30, &[BadgeKind::StreakMaster])),
            vec![BadgeKind::ConsistencyKing]
        );
    }

    #[test]
    fn custom_rules_extend_the_set() {
        let rules = BadgeRuleSet::default()
            .with_rule(StreakThresholdRule::new(7, BadgeKind::WeeklyWarrior))
            .with_rule(StreakThresholdRule::new(1, BadgeKind::FirstSteps));
        assert_eq!(
            rules.evaluate(&streak_state(7, &[])),
            vec![BadgeKind::WeeklyWarrior, BadgeKind::FirstSteps]
        );
    }

    #[test]
    fn duplicate_rules_award_once() {
        let rules = BadgeRuleSet::empty()
            .with_rule(StreakThresholdRule::new(2, BadgeKind::FirstSteps))
            .with_rule(StreakThresholdRule::new(1, BadgeKind::FirstSteps));
        assert_eq!(rules.evaluate(&streak_state(5, &[])), vec![BadgeKind::FirstSteps]);
    }
}
