// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;
use proptest::prelude::*;

fn all_statuses() -> [SessionStatus; 5] {
    [
        SessionStatus::Idle,
        SessionStatus::Typing,
        SessionStatus::Working,
        SessionStatus::Waiting,
        SessionStatus::Error,
    ]
}

#[test]
fn self_transition_is_always_legal() {
    for s in all_statuses() {
        assert!(transition(s, s).is_ok());
    }
}

#[test]
fn working_cannot_go_to_typing() {
    assert!(transition(SessionStatus::Working, SessionStatus::Typing).is_err());
}

#[test]
fn error_cannot_go_to_typing() {
    assert!(transition(SessionStatus::Error, SessionStatus::Typing).is_err());
}

/// S5 — invalid transition is rejected, not coerced.
#[test]
fn invalid_transition_reports_both_states() {
    let err = transition(SessionStatus::Working, SessionStatus::Typing).unwrap_err();
    assert_eq!(err.from, SessionStatus::Working);
    assert_eq!(err.to, SessionStatus::Typing);
}

#[test]
fn priority_order_matches_spec() {
    assert!(SessionStatus::Error.priority() > SessionStatus::Waiting.priority());
    assert!(SessionStatus::Waiting.priority() > SessionStatus::Working.priority());
    assert!(SessionStatus::Working.priority() > SessionStatus::Typing.priority());
    assert!(SessionStatus::Typing.priority() > SessionStatus::Idle.priority());
}

#[test]
fn idle_and_waiting_can_reach_every_other_state() {
    for to in all_statuses() {
        assert!(SessionStatus::Idle.can_transition(to));
        assert!(SessionStatus::Waiting.can_transition(to));
    }
}

proptest! {
    /// Invariant 1: for any two statuses, transition legality is symmetric
    /// with can_transition, and never panics.
    #[test]
    fn transition_never_panics(a in 0u8..5, b in 0u8..5) {
        let statuses = all_statuses();
        let from = statuses[a as usize];
        let to = statuses[b as usize];
        let _ = transition(from, to);
    }
}
