use std::sync::Arc;

use sea_orm::DatabaseConnection;

use gatehouse_auth_types::cookie::CookieOptions;
use gatehouse_auth_types::token::TokenCodec;

use crate::config::RateLimits;
use crate::infra::db::{DbOAuthLinkStore, DbRefreshTokenStore, DbRoleStore, DbUserStore};
use crate::infra::google::GoogleIdentityProvider;
use crate::infra::mail::LogMailer;
use crate::infra::password::BcryptHasher;
use crate::ratelimit::MemoryRateLimiter;
use crate::usecase::rbac::RbacResolver;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub codec: TokenCodec,
    pub limiter: Arc<MemoryRateLimiter>,
    pub limits: RateLimits,
    pub cookie: CookieOptions,
    pub frontend_url: String,
    pub login_require_verified: bool,
    pub oauth_allow_signup: bool,
    pub google: Option<Arc<GoogleIdentityProvider>>,
}

impl AppState {
    pub fn user_store(&self) -> DbUserStore {
        DbUserStore {
            db: self.db.clone(),
        }
    }

    pub fn role_store(&self) -> DbRoleStore {
        DbRoleStore {
            db: self.db.clone(),
        }
    }

    pub fn refresh_token_store(&self) -> DbRefreshTokenStore {
        DbRefreshTokenStore {
            db: self.db.clone(),
        }
    }

    pub fn oauth_link_store(&self) -> DbOAuthLinkStore {
        DbOAuthLinkStore {
            db: self.db.clone(),
        }
    }

    pub fn rbac(&self) -> RbacResolver<DbRoleStore> {
        RbacResolver {
            roles: self.role_store(),
        }
    }

    pub fn hasher(&self) -> BcryptHasher {
        BcryptHasher
    }

    pub fn mailer(&self) -> LogMailer {
        LogMailer
    }
}
