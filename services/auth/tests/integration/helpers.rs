use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use gatehouse_auth::domain::repository::{
    Mailer, OAuthLinkStore, PasswordHasher, RefreshTokenStore, RoleStore, UserStore,
};
use gatehouse_auth::domain::types::{OAuthLink, RefreshTokenRecord, Role, User};
use gatehouse_auth::error::AuthServiceError;
use gatehouse_auth_types::token::TokenCodec;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";

pub fn test_codec() -> TokenCodec {
    TokenCodec::new(TEST_JWT_SECRET, 20 * 60, 7 * 86400)
}

// ── MockUserStore ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockUserStore {
    pub users: Arc<Mutex<Vec<User>>>,
}

impl MockUserStore {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(Mutex::new(users)),
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn get(&self, id: Uuid) -> Option<User> {
        self.users.lock().unwrap().iter().find(|u| u.id == id).cloned()
    }

    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }
}

impl UserStore for MockUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthServiceError> {
        Ok(self.get(id))
    }

    async fn list(&self) -> Result<Vec<User>, AuthServiceError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn create(&self, user: &User) -> Result<(), AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthServiceError::Conflict);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), AuthServiceError> {
        let mut users = self.users.lock().unwrap();
        match users.iter_mut().find(|u| u.id == user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(AuthServiceError::NotFound),
        }
    }
}

// ── MockRoleStore ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockRoleStore {
    pub roles: Arc<Vec<Role>>,
}

impl MockRoleStore {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: Arc::new(roles),
        }
    }
}

impl RoleStore for MockRoleStore {
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Role>, AuthServiceError> {
        Ok(self
            .roles
            .iter()
            .filter(|r| slugs.contains(&r.slug))
            .cloned()
            .collect())
    }
}

// ── MockRefreshTokenStore ────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockRefreshTokenStore {
    pub records: Arc<Mutex<Vec<RefreshTokenRecord>>>,
}

impl MockRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_count(&self) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.is_active())
            .count()
    }

    pub fn tamper_hash(&self, jti: Uuid, hash: &str) {
        let mut records = self.records.lock().unwrap();
        if let Some(r) = records.iter_mut().find(|r| r.jti == jti) {
            r.token_hash = hash.to_owned();
        }
    }
}

impl RefreshTokenStore for MockRefreshTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthServiceError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn find_active_by_jti(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, AuthServiceError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.jti == jti && r.is_active())
            .cloned())
    }

    async fn revoke_if_active(&self, jti: Uuid) -> Result<bool, AuthServiceError> {
        // One lock over check-and-set, mirroring the conditional UPDATE:
        // exactly one concurrent caller sees true.
        let mut records = self.records.lock().unwrap();
        match records
            .iter_mut()
            .find(|r| r.jti == jti && r.revoked_at.is_none())
        {
            Some(r) => {
                r.revoked_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke_all_active_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let mut records = self.records.lock().unwrap();
        let mut revoked = 0;
        for r in records
            .iter_mut()
            .filter(|r| r.user_id == user_id && r.is_active())
        {
            r.revoked_at = Some(Utc::now());
            revoked += 1;
        }
        Ok(revoked)
    }
}

// ── MockOAuthLinkStore ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockOAuthLinkStore {
    pub links: Arc<Mutex<Vec<OAuthLink>>>,
}

impl MockOAuthLinkStore {
    pub fn new(links: Vec<OAuthLink>) -> Self {
        Self {
            links: Arc::new(Mutex::new(links)),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.links.lock().unwrap().len()
    }
}

impl OAuthLinkStore for MockOAuthLinkStore {
    async fn find_by_provider_subject(
        &self,
        provider: &str,
        provider_sub: &str,
    ) -> Result<Option<OAuthLink>, AuthServiceError> {
        Ok(self
            .links
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.provider == provider && l.provider_sub == provider_sub)
            .cloned())
    }

    async fn insert(&self, link: &OAuthLink) -> Result<(), AuthServiceError> {
        self.links.lock().unwrap().push(link.clone());
        Ok(())
    }
}

// ── TestHasher / MockMailer ──────────────────────────────────────────────────

/// Deterministic stand-in for bcrypt; hashes are `hashed:{raw}`.
#[derive(Clone, Copy)]
pub struct TestHasher;

impl PasswordHasher for TestHasher {
    fn hash(&self, raw: &str) -> Result<String, AuthServiceError> {
        Ok(format!("hashed:{raw}"))
    }

    fn verify(&self, raw: &str, hash: &str) -> bool {
        hash == format!("hashed:{raw}")
    }
}

#[derive(Clone, Default)]
pub struct MockMailer {
    pub sent: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// Token embedded in the last mailed link (`...?token=<jwt>`).
    pub fn last_token(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let (_, _, body) = sent.last().expect("no mail sent");
        body.split("token=")
            .nth(1)
            .expect("no token in mail body")
            .split_whitespace()
            .next()
            .expect("empty token")
            .to_owned()
    }
}

impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), AuthServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_owned(), subject.to_owned(), body.to_owned()));
        Ok(())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_user(email: &str, password: &str) -> User {
    let mut user = User::new(
        email.to_owned(),
        "Test User".to_owned(),
        format!("hashed:{password}"),
    );
    user.email_verified_at = Some(Utc::now());
    user
}

pub fn test_role(slug: &str, perms: &[&str]) -> Role {
    Role {
        slug: slug.to_owned(),
        permissions: perms.iter().map(|p| (*p).to_owned()).collect(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// The `user` role every fixture signup gets by default.
pub fn default_roles() -> MockRoleStore {
    MockRoleStore::new(vec![test_role("user", &["profile:read", "profile:write"])])
}
