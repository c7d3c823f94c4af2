// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

use super::*;

#[test]
fn wire_codes_are_stable_strings() {
    assert_eq!(ErrorCode::InvalidTerminal.as_str(), "invalid_terminal");
    assert_eq!(ErrorCode::SendFailed.as_str(), "send_failed");
    assert_eq!(ErrorCode::TransitionRejected.as_str(), "transition_rejected");
    assert_eq!(ErrorCode::Internal.as_str(), "internal");
}

#[test]
fn http_status_matches_policy() {
    assert_eq!(ErrorCode::InvalidTerminal.http_status(), 404);
    assert_eq!(ErrorCode::TransitionRejected.http_status(), 409);
    assert_eq!(ErrorCode::Internal.http_status(), 500);
}

#[test]
fn unauthorized_is_401() {
    assert_eq!(ErrorCode::Unauthorized.as_str(), "unauthorized");
    assert_eq!(ErrorCode::Unauthorized.http_status(), 401);
}

#[test]
fn body_carries_message_and_code() {
    let body = ErrorCode::SendFailed.body("write timed out");
    assert_eq!(body.code, "send_failed");
    assert_eq!(body.message, "write timed out");
}
