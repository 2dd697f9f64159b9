use std::sync::Arc;

use sea_orm::Database;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use gatehouse_auth::config::AuthConfig;
use gatehouse_auth::infra::google::GoogleIdentityProvider;
use gatehouse_auth::ratelimit::MemoryRateLimiter;
use gatehouse_auth::router::build_router;
use gatehouse_auth::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json())
        .init();

    let config = AuthConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let google = config.google.as_ref().map(|g| {
        Arc::new(GoogleIdentityProvider::new(
            g.client_id.clone(),
            g.client_secret.clone(),
            g.redirect_uri.clone(),
        ))
    });
    if google.is_none() {
        info!("google oauth not configured; provider routes answer 404");
    }

    let state = AppState {
        db,
        codec: config.token_codec(),
        limiter: Arc::new(MemoryRateLimiter::new()),
        limits: config.rate_limits,
        cookie: config.cookie_options(),
        frontend_url: config.frontend_url.clone(),
        login_require_verified: config.login_require_verified,
        oauth_allow_signup: config.oauth_allow_signup,
        google,
    };

    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.auth_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("auth service listening on {addr}");
    axum::serve(listener, router).await.expect("server error");
}
