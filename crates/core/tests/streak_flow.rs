//! Integration tests for the streak and badge engine.
//!
//! Drives a user through realistic activity sequences:
//! - Consecutive days, gaps and repeated same-day activity
//! - Automatic streak badges at 10 and 30 days
//! - Direct badge awards alongside rule-driven ones

mod common;

use common::{day, day_at};
use fitquest_core::badge::{BadgeKind, BadgeRuleSet, StreakThresholdRule};
use fitquest_core::config::GamificationConfig;
use fitquest_core::streak::{StreakBadgeState, StreakChange, StreakEngine};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn engine() -> StreakEngine {
    StreakEngine::new(&GamificationConfig::default()).unwrap()
}

fn replay(engine: &StreakEngine, days: &[i64]) -> StreakBadgeState {
    let mut state = StreakBadgeState::new("lifter-3");
    for &offset in days {
        state = engine.record_activity(&state, day(offset)).unwrap().state;
        assert!(state.longest_streak >= state.current_streak);
    }
    state
}

// ---------------------------------------------------------------------------
// Tests: streak counting
// ---------------------------------------------------------------------------

#[test]
fn three_consecutive_days() {
    common::init_tracing();
    let state = replay(&engine(), &[1, 2, 3]);
    assert_eq!(state.current_streak, 3);
    assert_eq!(state.longest_streak, 3);
}

#[test]
fn gap_after_two_days() {
    let state = replay(&engine(), &[1, 2, 5]);
    assert_eq!(state.current_streak, 1);
    assert_eq!(state.longest_streak, 2);
}

#[test]
fn same_day_twice_changes_nothing_but_the_timestamp() {
    let engine = engine();
    let state = replay(&engine, &[1, 2]);

    let morning = engine.record_activity(&state, day_at(2, 6)).unwrap();
    let evening = engine.record_activity(&morning.state, day_at(2, 23)).unwrap();
    for outcome in [&morning, &evening] {
        assert_eq!(outcome.change, StreakChange::SameDay);
        assert_eq!(outcome.state.current_streak, state.current_streak);
        assert_eq!(outcome.state.longest_streak, state.longest_streak);
    }
    assert_eq!(evening.state.last_activity_date, Some(day_at(2, 23)));
}

#[test]
fn new_run_can_beat_old_longest() {
    let state = replay(&engine(), &[1, 2, 3, 10, 11, 12, 13]);
    assert_eq!(state.current_streak, 4);
    assert_eq!(state.longest_streak, 4);
}

// ---------------------------------------------------------------------------
// Tests: badges
// ---------------------------------------------------------------------------

#[test]
fn thirty_day_run_earns_both_streak_badges_once() {
    let engine = engine();
    let mut state = StreakBadgeState::new("lifter-3");
    let mut awarded = Vec::new();

    for offset in 0..30 {
        let outcome = engine.record_activity(&state, day(offset)).unwrap();
        if !outcome.newly_awarded.is_empty() {
            awarded.push((outcome.state.current_streak, outcome.newly_awarded.clone()));
        }
        state = outcome.state;
    }

    assert_eq!(
        awarded,
        vec![
            (10, vec![BadgeKind::StreakMaster]),
            (30, vec![BadgeKind::ConsistencyKing]),
        ]
    );
    assert_eq!(engine.badge_count(&state), 2);
}

#[test]
fn streak_badges_survive_a_reset() {
    let engine = engine();
    let days: Vec<i64> = (0..10).chain([20]).collect();
    let state = replay(&engine, &days);
    assert_eq!(state.current_streak, 1);
    assert!(state.has_badge(BadgeKind::StreakMaster));
}

#[test]
fn manual_award_then_rule_award() {
    let engine = engine();
    let award = engine.award_badge(&StreakBadgeState::new("lifter-3"), BadgeKind::StreakMaster);
    assert!(!award.already_held);

    let mut state = award.state;
    for offset in 0..10 {
        let outcome = engine.record_activity(&state, day(offset)).unwrap();
        assert!(outcome.newly_awarded.is_empty());
        state = outcome.state;
    }
    assert_eq!(engine.badge_count(&state), 1);

    let again = engine.award_badge(&state, BadgeKind::StreakMaster);
    assert!(again.already_held);
    assert_eq!(engine.badge_count(&again.state), 1);
}

#[test]
fn weekly_warrior_via_custom_rule() {
    let engine = engine().with_rules(
        BadgeRuleSet::default().with_rule(StreakThresholdRule::new(7, BadgeKind::WeeklyWarrior)),
    );
    let state = replay(&engine, &[0, 1, 2, 3, 4, 5, 6]);
    assert!(state.has_badge(BadgeKind::WeeklyWarrior));
    assert!(!state.has_badge(BadgeKind::StreakMaster));
}
