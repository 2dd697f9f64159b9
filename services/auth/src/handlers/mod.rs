pub mod auth;
pub mod health;
pub mod me;
pub mod oauth;
pub mod users;

use axum::http::{HeaderMap, header};

use crate::domain::types::ClientMeta;
use crate::error::AuthServiceError;
use crate::ratelimit::{Limit, RateLimitDecision, RateLimiter as _, limiter_key};
use crate::state::AppState;

/// Client metadata recorded with issued refresh tokens and used as the
/// throttle identity. The first `x-forwarded-for` hop wins when present.
pub(crate) fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_owned());
    ClientMeta { user_agent, ip }
}

/// Count one hit for `scope` against the client's identity.
pub(crate) fn enforce_limit(
    state: &AppState,
    client: &ClientMeta,
    scope: &str,
    limit: Limit,
) -> Result<(), AuthServiceError> {
    let identity = client.ip.as_deref().unwrap_or("unknown");
    let key = limiter_key(identity, scope);
    match state.limiter.hit(&key, limit) {
        RateLimitDecision::Allowed => Ok(()),
        RateLimitDecision::Limited => {
            tracing::debug!(key, "rate limited");
            Err(AuthServiceError::RateLimited)
        }
    }
}

/// Pull the raw token out of an `Authorization: Bearer` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Result<String, AuthServiceError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
        .ok_or(AuthServiceError::Unauthorized)
}
