use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Role slug assigned to every self-service signup.
pub const DEFAULT_ROLE: &str = "user";

/// Stored user-agent strings are clipped to this length.
pub const USER_AGENT_MAX_LEN: usize = 255;

/// Identity record owned by the user store.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub is_active: bool,
    pub email_verified_at: Option<DateTime<Utc>>,
    /// Assigned role slugs, expanded to permissions at token issuance.
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Fresh record with the default role, an unverified email, and audit
    /// timestamps set to now.
    pub fn new(email: String, full_name: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            full_name,
            password_hash,
            is_active: true,
            email_verified_at: None,
            roles: vec![DEFAULT_ROLE.to_owned()],
            created_at: now,
            updated_at: now,
        }
    }
}

/// Named permission bundle, read-only from this service's perspective.
#[derive(Debug, Clone)]
pub struct Role {
    pub slug: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One record per issued refresh token, keyed by jti.
#[derive(Debug, Clone)]
pub struct RefreshTokenRecord {
    pub jti: Uuid,
    pub user_id: Uuid,
    /// SHA-256 hex digest of the raw token. The raw value is never stored.
    pub token_hash: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    /// Unrevoked and unexpired: the single proof the token is redeemable.
    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none() && self.expires_at > Utc::now()
    }
}

/// Binds a (provider, provider_sub) pair to a local user.
#[derive(Debug, Clone)]
pub struct OAuthLink {
    pub id: Uuid,
    pub provider: String,
    pub provider_sub: String,
    pub user_id: Uuid,
    pub email: Option<String>,
    pub name: Option<String>,
    pub picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Third-party identity assertion, already signature- and issuer-checked
/// by the provider glue before it reaches the linker.
#[derive(Debug, Clone)]
pub struct IdentityAssertion {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub email_verified: bool,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Issuing client metadata recorded with each refresh token.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}
