use axum::{
    Router,
    http::{HeaderName, HeaderValue, Request},
    routing::{get, post},
};
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::handlers::{
    auth::{
        confirm_verification, forgot_password, login, logout, refresh, request_verification,
        reset_password, signup,
    },
    health::{healthz, readyz},
    me::me,
    oauth::{google_callback, google_start},
    users::list_users,
};
use crate::state::AppState;

/// Tags each request with a fresh UUID under `x-request-id`.
#[derive(Clone, Default)]
struct MakeUuidRequestId;

impl MakeRequestId for MakeUuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = HeaderName::from_static("x-request-id");
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Password credentials
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        // Email verification
        .route("/auth/verify/request", post(request_verification))
        .route("/auth/verify/confirm", get(confirm_verification))
        // Password reset
        .route("/auth/password/forgot", post(forgot_password))
        .route("/auth/password/reset", post(reset_password))
        // Google OIDC
        .route("/auth/google/start", get(google_start))
        .route("/auth/google/callback", get(google_callback))
        // Identity
        .route("/me", get(me))
        .route("/users", get(list_users))
        // Layers apply outermost-last: the id is set before tracing sees the
        // request and echoed onto the response on the way out.
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeUuidRequestId))
        .with_state(state)
}
