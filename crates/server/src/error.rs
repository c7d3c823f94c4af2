// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Stable error codes shared across the HTTP and WebSocket surfaces.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Internal error kinds named in the failure-handling design: each maps to
/// a policy decision, not all of them cross the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Adapter call timed out or returned an OS error.
    TransientIo(String),
    /// The reconciler rejected a transition.
    InvalidTransition { from: String, to: String },
    /// A hook event id has already been seen.
    DuplicateHook,
    /// Schema migration failed at startup.
    Fatal(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::TransientIo(msg) => write!(f, "transient I/O error: {msg}"),
            CoreError::InvalidTransition { from, to } => {
                write!(f, "invalid transition {from} -> {to}")
            }
            CoreError::DuplicateHook => write!(f, "duplicate hook event id"),
            CoreError::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Stable codes returned to clients, per the external error surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidTerminal,
    SendFailed,
    TransitionRejected,
    Internal,
    /// Ambient addition (auth surface, §6.1 SPEC_FULL): missing or
    /// mismatched bearer/query token.
    Unauthorized,
}

impl ErrorCode {
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidTerminal => 404,
            ErrorCode::SendFailed => 502,
            ErrorCode::TransitionRejected => 409,
            ErrorCode::Internal => 500,
            ErrorCode::Unauthorized => 401,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidTerminal => "invalid_terminal",
            ErrorCode::SendFailed => "send_failed",
            ErrorCode::TransitionRejected => "transition_rejected",
            ErrorCode::Internal => "internal",
            ErrorCode::Unauthorized => "unauthorized",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire shape for the `error` WebSocket message / HTTP error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ErrorCode {
    pub fn body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { code: self.as_str(), message: message.into() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
