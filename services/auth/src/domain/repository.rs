#![allow(async_fn_in_trait)]

use uuid::Uuid;

use crate::domain::types::{IdentityAssertion, OAuthLink, RefreshTokenRecord, Role, User};
use crate::error::AuthServiceError;

/// Store for identity records.
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthServiceError>;

    /// Every user record, for the permission-guarded admin listing.
    async fn list(&self) -> Result<Vec<User>, AuthServiceError>;

    /// Insert a new user. A duplicate email is `Conflict`.
    async fn create(&self, user: &User) -> Result<(), AuthServiceError>;

    /// Persist mutated fields (verification stamp, password hash).
    async fn save(&self, user: &User) -> Result<(), AuthServiceError>;
}

/// Read-only store for permission bundles.
pub trait RoleStore: Send + Sync {
    /// Load every role whose slug appears in `slugs`. Unknown slugs are
    /// silently absent from the result.
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Role>, AuthServiceError>;
}

/// Store for refresh-token records.
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthServiceError>;

    /// Find the record for `jti` if it is unrevoked and unexpired.
    async fn find_active_by_jti(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, AuthServiceError>;

    /// Conditionally revoke: set `revoked_at` iff it is still null.
    ///
    /// Returns `true` only for the caller that actually flipped the record,
    /// so concurrent rotation attempts on one jti resolve to a single winner.
    async fn revoke_if_active(&self, jti: Uuid) -> Result<bool, AuthServiceError>;

    /// Revoke every active record for a user. Returns how many were revoked.
    async fn revoke_all_active_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError>;
}

/// Store for third-party identity links.
pub trait OAuthLinkStore: Send + Sync {
    async fn find_by_provider_subject(
        &self,
        provider: &str,
        provider_sub: &str,
    ) -> Result<Option<OAuthLink>, AuthServiceError>;

    async fn insert(&self, link: &OAuthLink) -> Result<(), AuthServiceError>;
}

/// External password-hashing primitive.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, raw: &str) -> Result<String, AuthServiceError>;

    /// `false` for a mismatch or an unparseable stored hash.
    fn verify(&self, raw: &str, hash: &str) -> bool;
}

/// Outbound mail delivery. Formatting and transport live outside the core.
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthServiceError>;
}

/// Third-party identity provider glue: builds the redirect URL and turns an
/// authorization code into a verified assertion.
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> String;

    async fn exchange_code(&self, code: &str) -> Result<IdentityAssertion, AuthServiceError>;
}
