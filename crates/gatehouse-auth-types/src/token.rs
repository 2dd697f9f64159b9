//! Signed bearer-token codec.
//!
//! One shared HS256 secret signs every token kind; the mandatory `type`
//! claim is what tells them apart. The codec itself applies no kind-specific
//! policy — callers must check [`Claims::kind`] after validation, and
//! revocation checks (refresh tokens) are the session layer's job.

use jsonwebtoken::{DecodingKey, Validation, decode};
#[cfg(any(feature = "issuer", test))]
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Deserialize;
#[cfg(any(feature = "issuer", test))]
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};
#[cfg(any(feature = "issuer", test))]
use uuid::Uuid;

/// Fixed lifetime of a verify-email token (24 hours).
pub const VERIFY_EMAIL_TTL_SECS: u64 = 24 * 3600;

/// Fixed lifetime of a reset-password token (1 hour).
pub const RESET_PASSWORD_TTL_SECS: u64 = 3600;

/// Fixed lifetime of an oauth-state anti-CSRF token (10 minutes).
pub const OAUTH_STATE_TTL_SECS: u64 = 600;

/// The five token kinds, carried in the `type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenKind {
    Access,
    Refresh,
    VerifyEmail,
    ResetPassword,
    OauthState,
}

/// Errors surfaced by the codec.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid signature")]
    BadSignature,
    #[error("malformed token")]
    Malformed,
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Claim set shared by all five token kinds.
///
/// `roles`/`perms` are present on access tokens, `email` on verify-email
/// tokens, `nonce` on oauth-state tokens; everything else carries `None`.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(any(feature = "issuer", test), derive(Serialize))]
pub struct Claims {
    /// Subject (user id, or the literal state owner for oauth-state).
    pub sub: String,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Unique token id. Refresh tokens are persisted keyed by this.
    pub jti: String,
    /// Issued-at, seconds since UNIX epoch.
    pub iat: u64,
    /// Expiry, seconds since UNIX epoch.
    pub exp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}

/// Issues and validates signed tokens with a single shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    /// Decode and validate a token of any kind.
    ///
    /// Checks signature and expiry (no leeway) only. The caller is
    /// responsible for checking `kind` and, for refresh tokens, revocation.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed,
        })?;

        Ok(data.claims)
    }
}

#[cfg(any(feature = "issuer", test))]
impl TokenCodec {
    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(TokenError::Signing)
    }

    fn base_claims(sub: &str, kind: TokenKind, ttl_secs: u64) -> Claims {
        let iat = now_secs();
        Claims {
            sub: sub.to_owned(),
            kind,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + ttl_secs,
            roles: None,
            perms: None,
            email: None,
            nonce: None,
        }
    }

    /// Issue an access token embedding the subject's roles and permissions
    /// as resolved at issuance time.
    pub fn issue_access(
        &self,
        sub: &str,
        roles: Vec<String>,
        perms: Vec<String>,
    ) -> Result<(String, Claims), TokenError> {
        let mut claims = Self::base_claims(sub, TokenKind::Access, self.access_ttl_secs);
        claims.roles = Some(roles);
        claims.perms = Some(perms);
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    /// Issue a refresh token. `ttl_secs` overrides the configured lifetime
    /// for this call only.
    pub fn issue_refresh(
        &self,
        sub: &str,
        ttl_secs: Option<u64>,
    ) -> Result<(String, Claims), TokenError> {
        let ttl = ttl_secs.unwrap_or(self.refresh_ttl_secs);
        let claims = Self::base_claims(sub, TokenKind::Refresh, ttl);
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    pub fn issue_verify_email(&self, sub: &str, email: &str) -> Result<(String, Claims), TokenError> {
        let mut claims = Self::base_claims(sub, TokenKind::VerifyEmail, VERIFY_EMAIL_TTL_SECS);
        claims.email = Some(email.to_owned());
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    pub fn issue_reset_password(&self, sub: &str) -> Result<(String, Claims), TokenError> {
        let claims = Self::base_claims(sub, TokenKind::ResetPassword, RESET_PASSWORD_TTL_SECS);
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }

    /// Issue the anti-CSRF correlator for a third-party redirect flow.
    pub fn issue_oauth_state(&self, nonce: &str) -> Result<(String, Claims), TokenError> {
        let mut claims = Self::base_claims("oauth-state", TokenKind::OauthState, OAUTH_STATE_TTL_SECS);
        claims.nonce = Some(nonce.to_owned());
        let token = self.sign(&claims)?;
        Ok((token, claims))
    }
}
