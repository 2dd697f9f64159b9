use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use gatehouse_auth_types::token::{Claims, TokenCodec, TokenKind};

use crate::domain::repository::{PasswordHasher, RefreshTokenStore, RoleStore, UserStore};
use crate::domain::types::{ClientMeta, RefreshTokenRecord, USER_AGENT_MAX_LEN, User};
use crate::error::AuthServiceError;
use crate::usecase::rbac::RbacResolver;

/// Hash a raw refresh token for storage and comparison.
/// Only this digest ever touches the record store.
pub fn hash_refresh_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

fn signing(e: gatehouse_auth_types::token::TokenError) -> AuthServiceError {
    AuthServiceError::Internal(e.into())
}

fn datetime_from_unix(secs: u64) -> Result<DateTime<Utc>, AuthServiceError> {
    DateTime::<Utc>::from_timestamp(secs as i64, 0)
        .context("token expiry out of range")
        .map_err(AuthServiceError::Internal)
}

/// Tokens minted for a freshly opened (or rotated) session.
#[derive(Debug)]
pub struct SessionTokens {
    pub access_token: String,
    pub access_claims: Claims,
    pub refresh_token: String,
}

/// Issue an access + refresh pair for `user` and persist the refresh record.
///
/// Permissions are resolved from the user's current roles at issuance time.
/// A failed record insert surfaces as a hard error; the tokens issued in
/// that case are never returned to the caller.
pub(crate) async fn open_session<R, T>(
    rbac: &RbacResolver<R>,
    refresh_tokens: &T,
    codec: &TokenCodec,
    user: &User,
    client: &ClientMeta,
) -> Result<SessionTokens, AuthServiceError>
where
    R: RoleStore,
    T: RefreshTokenStore,
{
    let perms = rbac.permissions_for(&user.roles).await?;
    let sub = user.id.to_string();

    let (access_token, access_claims) = codec
        .issue_access(&sub, user.roles.clone(), perms.into_iter().collect())
        .map_err(signing)?;
    let (refresh_token, refresh_claims) = codec.issue_refresh(&sub, None).map_err(signing)?;

    let record = RefreshTokenRecord {
        jti: refresh_claims
            .jti
            .parse()
            .context("issued refresh jti is not a uuid")
            .map_err(AuthServiceError::Internal)?,
        user_id: user.id,
        token_hash: hash_refresh_token(&refresh_token),
        user_agent: client
            .user_agent
            .as_ref()
            .map(|ua| ua.chars().take(USER_AGENT_MAX_LEN).collect()),
        ip: client.ip.clone(),
        expires_at: datetime_from_unix(refresh_claims.exp)?,
        revoked_at: None,
        created_at: Utc::now(),
    };
    refresh_tokens.insert(&record).await?;

    Ok(SessionTokens {
        access_token,
        access_claims,
        refresh_token,
    })
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub client: ClientMeta,
}

#[derive(Debug)]
pub struct LoginOutput {
    pub user: User,
    pub tokens: SessionTokens,
}

pub struct LoginUseCase<U, R, T, H>
where
    U: UserStore,
    R: RoleStore,
    T: RefreshTokenStore,
    H: PasswordHasher,
{
    pub users: U,
    pub rbac: RbacResolver<R>,
    pub refresh_tokens: T,
    pub hasher: H,
    pub codec: TokenCodec,
    pub require_verified: bool,
}

impl<U, R, T, H> LoginUseCase<U, R, T, H>
where
    U: UserStore,
    R: RoleStore,
    T: RefreshTokenStore,
    H: PasswordHasher,
{
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, AuthServiceError> {
        let user = self
            .users
            .find_by_email(&input.email)
            .await?
            .ok_or(AuthServiceError::Unauthorized)?;

        if !self.hasher.verify(&input.password, &user.password_hash) {
            return Err(AuthServiceError::Unauthorized);
        }
        if !user.is_active {
            return Err(AuthServiceError::Unauthorized);
        }
        if self.require_verified && user.email_verified_at.is_none() {
            return Err(AuthServiceError::Forbidden);
        }

        let tokens = open_session(
            &self.rbac,
            &self.refresh_tokens,
            &self.codec,
            &user,
            &input.client,
        )
        .await?;

        Ok(LoginOutput { user, tokens })
    }
}

// ── Refresh (rotation) ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct RefreshOutput {
    pub user_id: Uuid,
    pub tokens: SessionTokens,
}

pub struct RefreshSessionUseCase<U, R, T>
where
    U: UserStore,
    R: RoleStore,
    T: RefreshTokenStore,
{
    pub users: U,
    pub rbac: RbacResolver<R>,
    pub refresh_tokens: T,
    pub codec: TokenCodec,
}

impl<U, R, T> RefreshSessionUseCase<U, R, T>
where
    U: UserStore,
    R: RoleStore,
    T: RefreshTokenStore,
{
    /// Rotate a presented refresh token.
    ///
    /// Every rejection is `Unauthorized`: decode failures, wrong kind,
    /// unknown or revoked jti, and a stored-hash mismatch all look the same
    /// from outside.
    pub async fn execute(
        &self,
        raw: &str,
        client: &ClientMeta,
    ) -> Result<RefreshOutput, AuthServiceError> {
        let claims = self
            .codec
            .validate(raw)
            .map_err(|_| AuthServiceError::Unauthorized)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AuthServiceError::Unauthorized);
        }
        let jti: Uuid = claims
            .jti
            .parse()
            .map_err(|_| AuthServiceError::Unauthorized)?;

        let record = self
            .refresh_tokens
            .find_active_by_jti(jti)
            .await?
            .ok_or(AuthServiceError::Unauthorized)?;

        // The hash is the authoritative "this exact token is on file" check.
        if record.token_hash != hash_refresh_token(raw) {
            return Err(AuthServiceError::Unauthorized);
        }

        // Revoke before issuing the replacement. A concurrent rotation of the
        // same token loses here and gets Unauthorized; an abort after this
        // point leaves the lineage logged out, never doubled.
        if !self.refresh_tokens.revoke_if_active(jti).await? {
            return Err(AuthServiceError::Unauthorized);
        }

        let user = self
            .users
            .find_by_id(record.user_id)
            .await?
            .ok_or(AuthServiceError::Unauthorized)?;
        if !user.is_active {
            return Err(AuthServiceError::Unauthorized);
        }

        // New access token from freshly resolved roles, not the stale claims
        // embedded in the presented token.
        let tokens = open_session(
            &self.rbac,
            &self.refresh_tokens,
            &self.codec,
            &user,
            client,
        )
        .await?;

        Ok(RefreshOutput {
            user_id: user.id,
            tokens,
        })
    }
}

// ── Logout ───────────────────────────────────────────────────────────────────

pub struct LogoutUseCase<T: RefreshTokenStore> {
    pub refresh_tokens: T,
    pub codec: TokenCodec,
}

impl<T: RefreshTokenStore> LogoutUseCase<T> {
    /// Best-effort revocation. Garbage, expired, or missing cookies are all
    /// fine — logout is idempotent and never fails.
    pub async fn execute(&self, raw: Option<&str>) {
        let Some(raw) = raw else { return };
        let Ok(claims) = self.codec.validate(raw) else {
            return;
        };
        if claims.kind != TokenKind::Refresh {
            return;
        }
        let Ok(jti) = claims.jti.parse::<Uuid>() else {
            return;
        };
        if let Err(e) = self.refresh_tokens.revoke_if_active(jti).await {
            tracing::warn!(error = %e, %jti, "logout revocation failed");
        }
    }
}
