use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use serde::Serialize;

use crate::domain::repository::UserStore as _;
use crate::domain::types::User;
use crate::error::AuthServiceError;
use crate::handlers::bearer_token;
use crate::state::AppState;
use crate::usecase::rbac::{PermissionSource, require_permissions};

#[derive(Serialize)]
pub struct UserSummary {
    pub id: uuid::Uuid,
    pub email: String,
    pub full_name: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub roles: Vec<String>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            is_active: user.is_active,
            email_verified: user.email_verified_at.is_some(),
            roles: user.roles,
        }
    }
}

/// Handler for `GET /users` — the admin listing. Demands `users:read`
/// resolved from current role assignments, so a revoked role locks the
/// holder out even while their access token is still live.
pub async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthServiceError> {
    let token = bearer_token(&headers)?;
    let users = state.user_store();
    require_permissions(
        &state.codec,
        &state.rbac(),
        &users,
        &token,
        &["users:read"],
        PermissionSource::Fresh,
    )
    .await?;

    let listing: Vec<UserSummary> = users.list().await?.into_iter().map(Into::into).collect();
    Ok(Json(listing))
}
