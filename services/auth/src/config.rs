use axum_extra::extract::cookie::SameSite;

use gatehouse_auth_types::cookie::CookieOptions;
use gatehouse_auth_types::token::TokenCodec;

use crate::ratelimit::Limit;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Per-endpoint throttle limits, parsed eagerly so a bad value fails at
/// startup instead of on the first request.
#[derive(Clone, Copy, Debug)]
pub struct RateLimits {
    pub login: Limit,
    pub signup: Limit,
    pub forgot_password: Limit,
    pub verify_request: Limit,
    pub google_start: Limit,
    pub google_callback: Limit,
}

impl RateLimits {
    fn from_env() -> Self {
        let limit = |key: &str, default: &str| -> Limit {
            env_or(key, default).parse().expect(key)
        };
        Self {
            login: limit("RATE_LIMIT_LOGIN", "5/300"),
            signup: limit("RATE_LIMIT_SIGNUP", "3/1800"),
            forgot_password: limit("RATE_LIMIT_FORGOT_PASSWORD", "3/900"),
            verify_request: limit("RATE_LIMIT_VERIFY_REQUEST", "5/1800"),
            google_start: limit("RATE_LIMIT_GOOGLE_START", "30/min"),
            google_callback: limit("RATE_LIMIT_GOOGLE_CALLBACK", "60/min"),
        }
    }
}

/// Google OIDC client settings; absent means the provider routes answer 404.
#[derive(Debug)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl GoogleConfig {
    fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        Some(Self {
            client_id,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET").expect("GOOGLE_CLIENT_SECRET"),
            redirect_uri: std::env::var("GOOGLE_REDIRECT_URI").expect("GOOGLE_REDIRECT_URI"),
        })
    }
}

/// Auth service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AuthConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HMAC secret for signing every token kind.
    pub jwt_secret: String,
    /// Access-token lifetime in minutes (default 20).
    pub access_ttl_mins: u64,
    /// Refresh-token lifetime in days (default 7).
    pub refresh_ttl_days: u64,
    /// Refuse password login for unverified accounts.
    pub login_require_verified: bool,
    /// Allow first-contact provider logins to create local accounts.
    pub oauth_allow_signup: bool,
    /// Base URL for links embedded in outbound mail.
    pub frontend_url: String,
    /// Cookie domain attribute; unset leaves the cookie host-only.
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    /// Cookie SameSite attribute: "lax", "strict" or "none".
    pub cookie_samesite: String,
    pub google: Option<GoogleConfig>,
    /// TCP port to listen on (default 3114). Env var: `AUTH_PORT`.
    pub auth_port: u16,
    pub rate_limits: RateLimits,
}

impl AuthConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            jwt_secret: std::env::var("JWT_SECRET").expect("JWT_SECRET"),
            access_ttl_mins: env_parsed("ACCESS_TOKEN_TTL_MINS", 20),
            refresh_ttl_days: env_parsed("REFRESH_TOKEN_TTL_DAYS", 7),
            login_require_verified: env_flag("LOGIN_REQUIRE_VERIFIED", false),
            oauth_allow_signup: env_flag("OAUTH_ALLOW_SIGNUP", true),
            frontend_url: env_or("FRONTEND_URL", "http://localhost:3000"),
            cookie_domain: std::env::var("COOKIE_DOMAIN").ok(),
            cookie_secure: env_flag("COOKIE_SECURE", false),
            cookie_samesite: env_or("COOKIE_SAMESITE", "lax"),
            google: GoogleConfig::from_env(),
            auth_port: env_parsed("AUTH_PORT", 3114),
            rate_limits: RateLimits::from_env(),
        }
    }

    pub fn token_codec(&self) -> TokenCodec {
        TokenCodec::new(
            self.jwt_secret.clone(),
            self.access_ttl_mins * 60,
            self.refresh_ttl_days * 86400,
        )
    }

    pub fn cookie_options(&self) -> CookieOptions {
        let same_site = match self.cookie_samesite.to_ascii_lowercase().as_str() {
            "strict" => SameSite::Strict,
            "none" => SameSite::None,
            _ => SameSite::Lax,
        };
        CookieOptions {
            domain: self.cookie_domain.clone(),
            secure: self.cookie_secure,
            same_site,
            max_age_secs: (self.refresh_ttl_days * 86400) as i64,
        }
    }
}
