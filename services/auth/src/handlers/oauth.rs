use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use gatehouse_auth_types::cookie::set_refresh_token_cookie;
use gatehouse_auth_types::token::TokenKind;

use crate::domain::repository::IdentityProvider as _;
use crate::error::AuthServiceError;
use crate::handlers::auth::TokenResponse;
use crate::handlers::{client_meta, enforce_limit};
use crate::infra::google::GoogleIdentityProvider;
use crate::state::AppState;
use crate::usecase::oauth::OAuthLoginUseCase;

fn provider(state: &AppState) -> Result<Arc<GoogleIdentityProvider>, AuthServiceError> {
    state.google.clone().ok_or(AuthServiceError::NotFound)
}

fn signing(e: gatehouse_auth_types::token::TokenError) -> AuthServiceError {
    AuthServiceError::Internal(e.into())
}

// ── GET /auth/google/start ────────────────────────────────────────────────────

pub async fn google_start(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "google_start", state.limits.google_start)?;
    let google = provider(&state)?;

    // The signed state token is the CSRF correlator; the callback refuses
    // anything the codec did not mint within the last ten minutes.
    let nonce = Uuid::new_v4().to_string();
    let (state_token, _) = state.codec.issue_oauth_state(&nonce).map_err(signing)?;

    Ok(Redirect::temporary(&google.authorize_url(&state_token)))
}

// ── GET /auth/google/callback ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "google_callback", state.limits.google_callback)?;
    let google = provider(&state)?;

    let claims = state
        .codec
        .validate(&query.state)
        .map_err(|_| AuthServiceError::Unauthorized)?;
    if claims.kind != TokenKind::OauthState {
        return Err(AuthServiceError::Unauthorized);
    }

    let assertion = google.exchange_code(&query.code).await?;

    let usecase = OAuthLoginUseCase {
        users: state.user_store(),
        links: state.oauth_link_store(),
        rbac: state.rbac(),
        refresh_tokens: state.refresh_token_store(),
        codec: state.codec.clone(),
        allow_signup: state.oauth_allow_signup,
    };
    let out = usecase.execute(assertion, &client).await?;

    let jar = set_refresh_token_cookie(jar, out.tokens.refresh_token, &state.cookie);
    let status = if out.signed_up {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = TokenResponse::bearer(out.tokens.access_token, out.tokens.access_claims.exp);
    Ok((status, jar, Json(body)))
}
