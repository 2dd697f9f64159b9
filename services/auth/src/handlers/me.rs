use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use gatehouse_auth_types::token::TokenKind;

use crate::domain::repository::UserStore as _;
use crate::error::AuthServiceError;
use crate::handlers::bearer_token;
use crate::state::AppState;
use crate::usecase::rbac::PermissionSource;

#[derive(Deserialize)]
pub struct MeQuery {
    /// Recompute permissions from current role assignments instead of
    /// trusting the ones embedded in the token.
    #[serde(default)]
    pub fresh: bool,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
    pub email_verified: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// Handler for `GET /me` — identity and effective permissions behind a
/// bearer access token.
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<MeQuery>,
) -> Result<impl IntoResponse, AuthServiceError> {
    let token = bearer_token(&headers)?;
    let claims = state
        .codec
        .validate(&token)
        .map_err(|_| AuthServiceError::Unauthorized)?;
    if claims.kind != TokenKind::Access {
        return Err(AuthServiceError::Unauthorized);
    }

    let users = state.user_store();
    let source = if query.fresh {
        PermissionSource::Fresh
    } else {
        PermissionSource::Token
    };
    let permissions = state
        .rbac()
        .effective_permissions(&claims, &users, source)
        .await?;

    let user_id = claims
        .sub
        .parse()
        .map_err(|_| AuthServiceError::Unauthorized)?;
    let user = users
        .find_by_id(user_id)
        .await?
        .ok_or(AuthServiceError::NotFound)?;

    Ok(Json(MeResponse {
        id: user.id,
        email: user.email,
        full_name: user.full_name,
        email_verified: user.email_verified_at.is_some(),
        roles: user.roles,
        permissions: permissions.into_iter().collect(),
    }))
}
