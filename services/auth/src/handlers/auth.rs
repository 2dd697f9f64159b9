use axum::{
    Json,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};

use gatehouse_auth_types::cookie::{
    REFRESH_TOKEN_COOKIE, clear_refresh_token_cookie, set_refresh_token_cookie,
};

use crate::error::AuthServiceError;
use crate::handlers::{client_meta, enforce_limit};
use crate::state::AppState;
use crate::usecase::account::{
    ConfirmVerificationUseCase, ForgotPasswordUseCase, RequestVerificationUseCase,
    ResetPasswordUseCase, SignupInput, SignupUseCase,
};
use crate::usecase::session::{LoginInput, LoginUseCase, LogoutUseCase, RefreshSessionUseCase};

/// Access-token envelope returned by login, refresh and the oauth callback.
/// The refresh token rides separately in the http-only cookie.
#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: u64,
}

impl TokenResponse {
    pub(crate) fn bearer(access_token: String, expires_at: u64) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            expires_at,
        }
    }
}

// ── POST /auth/signup ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
}

pub async fn signup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SignupRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "signup", state.limits.signup)?;

    let usecase = SignupUseCase {
        users: state.user_store(),
        hasher: state.hasher(),
        mailer: state.mailer(),
        codec: state.codec.clone(),
        frontend_url: state.frontend_url.clone(),
    };
    let user = usecase
        .execute(SignupInput {
            email: body.email,
            password: body.password,
            full_name: body.full_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        }),
    ))
}

// ── POST /auth/login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "login", state.limits.login)?;

    let usecase = LoginUseCase {
        users: state.user_store(),
        rbac: state.rbac(),
        refresh_tokens: state.refresh_token_store(),
        hasher: state.hasher(),
        codec: state.codec.clone(),
        require_verified: state.login_require_verified,
    };
    let out = usecase
        .execute(LoginInput {
            email: body.email,
            password: body.password,
            client,
        })
        .await?;

    let jar = set_refresh_token_cookie(jar, out.tokens.refresh_token, &state.cookie);
    let body = TokenResponse::bearer(out.tokens.access_token, out.tokens.access_claims.exp);
    Ok((StatusCode::OK, jar, Json(body)))
}

// ── POST /auth/refresh ────────────────────────────────────────────────────────

pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let raw = jar
        .get(REFRESH_TOKEN_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(AuthServiceError::Unauthorized)?;

    let client = client_meta(&headers);
    let usecase = RefreshSessionUseCase {
        users: state.user_store(),
        rbac: state.rbac(),
        refresh_tokens: state.refresh_token_store(),
        codec: state.codec.clone(),
    };
    let out = usecase.execute(&raw, &client).await?;

    let jar = set_refresh_token_cookie(jar, out.tokens.refresh_token, &state.cookie);
    let body = TokenResponse::bearer(out.tokens.access_token, out.tokens.access_claims.exp);
    Ok((StatusCode::OK, jar, Json(body)))
}

// ── POST /auth/logout ─────────────────────────────────────────────────────────

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<impl IntoResponse, AuthServiceError> {
    let raw = jar.get(REFRESH_TOKEN_COOKIE).map(|c| c.value().to_owned());

    let usecase = LogoutUseCase {
        refresh_tokens: state.refresh_token_store(),
        codec: state.codec.clone(),
    };
    usecase.execute(raw.as_deref()).await;

    let jar = clear_refresh_token_cookie(jar, &state.cookie);
    Ok((StatusCode::NO_CONTENT, jar))
}

// ── POST /auth/verify/request ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

pub async fn request_verification(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EmailRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "verify_request", state.limits.verify_request)?;

    let usecase = RequestVerificationUseCase {
        users: state.user_store(),
        mailer: state.mailer(),
        codec: state.codec.clone(),
        frontend_url: state.frontend_url.clone(),
    };
    usecase.execute(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// ── GET /auth/verify/confirm ──────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ActionTokenQuery {
    pub token: String,
}

pub async fn confirm_verification(
    State(state): State<AppState>,
    Query(query): Query<ActionTokenQuery>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ConfirmVerificationUseCase {
        users: state.user_store(),
        codec: state.codec.clone(),
    };
    usecase.execute(&query.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── POST /auth/password/forgot ────────────────────────────────────────────────

pub async fn forgot_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<EmailRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let client = client_meta(&headers);
    enforce_limit(&state, &client, "forgot_password", state.limits.forgot_password)?;

    let usecase = ForgotPasswordUseCase {
        users: state.user_store(),
        mailer: state.mailer(),
        codec: state.codec.clone(),
        frontend_url: state.frontend_url.clone(),
    };
    usecase.execute(&body.email).await?;
    Ok(StatusCode::ACCEPTED)
}

// ── POST /auth/password/reset ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let usecase = ResetPasswordUseCase {
        users: state.user_store(),
        refresh_tokens: state.refresh_token_store(),
        hasher: state.hasher(),
        codec: state.codec.clone(),
    };
    usecase.execute(&body.token, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}
