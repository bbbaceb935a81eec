// Shared-secret header checks. Agents use X-Agent-Key, operators use X-API-Key.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AppState, error::ApiError};
use crate::models::{AGENT_KEY_HEADER, API_KEY_HEADER};

fn key_matches(headers: &HeaderMap, header: &str, expected: &str) -> bool {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected)
}

pub(super) async fn require_api_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !key_matches(req.headers(), API_KEY_HEADER, &state.auth.api_key) {
        tracing::debug!(path = %req.uri().path(), "rejected request: bad api key");
        return ApiError::Unauthorized.into_response();
    }
    next.run(req).await
}

pub(super) async fn require_agent_key(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !key_matches(req.headers(), AGENT_KEY_HEADER, &state.auth.agent_key) {
        tracing::warn!(path = %req.uri().path(), "rejected agent report: bad agent key");
        return ApiError::Unauthorized.into_response();
    }
    next.run(req).await
}
