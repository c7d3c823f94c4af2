// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Legal transitions for session status, and the priority ordering used to
//! break ties when more than one status source wants to set a new status.

use serde::{Deserialize, Serialize};

/// A session's externally visible status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Typing,
    Working,
    Waiting,
    Error,
}

impl SessionStatus {
    /// Priority used for reconciliation tie-breaks. Higher wins.
    pub fn priority(self) -> u8 {
        match self {
            SessionStatus::Error => 5,
            SessionStatus::Waiting => 4,
            SessionStatus::Working => 3,
            SessionStatus::Typing => 2,
            SessionStatus::Idle => 1,
        }
    }

    /// Whether a `from -> to` transition is legal (a state transitioning
    /// to itself is always legal, as a no-op).
    pub fn can_transition(self, to: SessionStatus) -> bool {
        if self == to {
            return true;
        }
        use SessionStatus::*;
        matches!(
            (self, to),
            (Idle, Typing | Working | Waiting | Error)
                | (Typing, Idle | Working | Waiting | Error)
                | (Working, Idle | Waiting | Error)
                | (Waiting, Idle | Typing | Working | Error)
                | (Error, Idle | Working | Waiting)
        )
    }
}

/// Error returned when an illegal transition is requested.
///
/// The caller must log and reject; states are never silently coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal transition {:?} -> {:?}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

/// Attempt a transition, returning the new status or an [`IllegalTransition`].
pub fn transition(
    from: SessionStatus,
    to: SessionStatus,
) -> Result<SessionStatus, IllegalTransition> {
    if from.can_transition(to) {
        Ok(to)
    } else {
        Err(IllegalTransition { from, to })
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
