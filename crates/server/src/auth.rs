// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 The Paneboard Authors

//! Bearer/query-token authentication (§6 SPEC_FULL ambient addition).
//! Constant-time comparison, exactly as the teacher's `validate_bearer`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::ErrorCode;
use crate::state::AppState;

fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut acc = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        acc |= x ^ y;
    }
    acc == 0
}

/// Validate a Bearer token from HTTP headers. `Ok(())` when `expected` is
/// `None` (auth disabled) or the header matches.
pub fn validate_bearer(headers: &HeaderMap, expected: Option<&str>) -> Result<(), ErrorCode> {
    let Some(expected) = expected else { return Ok(()) };
    let header = headers.get("authorization").and_then(|v| v.to_str().ok()).ok_or(ErrorCode::Unauthorized)?;
    let token = header.strip_prefix("Bearer ").ok_or(ErrorCode::Unauthorized)?;
    if constant_time_eq(token, expected) {
        Ok(())
    } else {
        Err(ErrorCode::Unauthorized)
    }
}

/// Validate a token passed as a WebSocket upgrade query parameter.
pub fn validate_query_token(token: Option<&str>, expected: Option<&str>) -> Result<(), ErrorCode> {
    match (expected, token) {
        (None, _) => Ok(()),
        (Some(expected), Some(token)) if constant_time_eq(token, expected) => Ok(()),
        _ => Err(ErrorCode::Unauthorized),
    }
}

/// Axum middleware: rejects any request outside `/ws` and `/healthz`
/// lacking a valid bearer token. `/ws` authenticates itself via the
/// upgrade query parameter instead (a bearer header cannot be attached to
/// a browser WebSocket handshake); `/healthz` is an ungated liveness
/// probe.
pub async fn auth_layer(State(state): State<Arc<AppState>>, req: Request, next: Next) -> Response {
    let path = req.uri().path();
    if path == "/ws" || path == "/healthz" {
        return next.run(req).await;
    }

    if let Err(code) = validate_bearer(req.headers(), state.config.auth_token.as_deref()) {
        let body = code.body("missing or invalid bearer token");
        return (StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::UNAUTHORIZED), axum::Json(body)).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
#[path = "auth_tests.rs"]
mod tests;
