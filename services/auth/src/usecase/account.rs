use chrono::Utc;
use uuid::Uuid;

use gatehouse_auth_types::token::{Claims, TokenCodec, TokenKind};

use crate::domain::repository::{Mailer, PasswordHasher, RefreshTokenStore, UserStore};
use crate::domain::types::User;
use crate::error::AuthServiceError;

const VERIFY_EMAIL_PATH: &str = "/verify-email";
const RESET_PASSWORD_PATH: &str = "/reset-password";

fn frontend_link(base: &str, path: &str, token: &str) -> String {
    format!("{}{path}?token={token}", base.trim_end_matches('/'))
}

fn signing(e: gatehouse_auth_types::token::TokenError) -> AuthServiceError {
    AuthServiceError::Internal(e.into())
}

/// Decode a single-use action token of the expected kind and extract its
/// subject. Anything off, including a kind mismatch, is `Malformed`: these
/// tokens arrive pasted from emails, not from an authenticated client.
fn action_token_subject(
    codec: &TokenCodec,
    token: &str,
    kind: TokenKind,
) -> Result<(Uuid, Claims), AuthServiceError> {
    let claims = codec
        .validate(token)
        .map_err(|_| AuthServiceError::Malformed)?;
    if claims.kind != kind {
        return Err(AuthServiceError::Malformed);
    }
    let user_id = claims
        .sub
        .parse()
        .map_err(|_| AuthServiceError::Malformed)?;
    Ok((user_id, claims))
}

// ── Signup ───────────────────────────────────────────────────────────────────

pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

pub struct SignupUseCase<U, H, M>
where
    U: UserStore,
    H: PasswordHasher,
    M: Mailer,
{
    pub users: U,
    pub hasher: H,
    pub mailer: M,
    pub codec: TokenCodec,
    pub frontend_url: String,
}

impl<U, H, M> SignupUseCase<U, H, M>
where
    U: UserStore,
    H: PasswordHasher,
    M: Mailer,
{
    pub async fn execute(&self, input: SignupInput) -> Result<User, AuthServiceError> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(AuthServiceError::Conflict);
        }

        let user = User::new(
            input.email,
            input.full_name,
            self.hasher.hash(&input.password)?,
        );
        // The unique index still backstops a racing duplicate; the store maps
        // that violation to Conflict as well.
        self.users.create(&user).await?;

        let (token, _) = self
            .codec
            .issue_verify_email(&user.id.to_string(), &user.email)
            .map_err(signing)?;
        let link = frontend_link(&self.frontend_url, VERIFY_EMAIL_PATH, &token);
        self.mailer
            .send(
                &user.email,
                "Verify your email",
                &format!(
                    "Welcome, {}!\n\nConfirm your address by opening:\n{link}\n",
                    user.full_name
                ),
            )
            .await?;

        Ok(user)
    }
}

// ── Email verification ───────────────────────────────────────────────────────

pub struct RequestVerificationUseCase<U, M>
where
    U: UserStore,
    M: Mailer,
{
    pub users: U,
    pub mailer: M,
    pub codec: TokenCodec,
    pub frontend_url: String,
}

impl<U, M> RequestVerificationUseCase<U, M>
where
    U: UserStore,
    M: Mailer,
{
    /// Re-send the verification link. Unknown addresses and already-verified
    /// accounts get the same silent Ok, so this endpoint is not an oracle.
    pub async fn execute(&self, email: &str) -> Result<(), AuthServiceError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(());
        };
        if user.email_verified_at.is_some() {
            return Ok(());
        }

        let (token, _) = self
            .codec
            .issue_verify_email(&user.id.to_string(), &user.email)
            .map_err(signing)?;
        let link = frontend_link(&self.frontend_url, VERIFY_EMAIL_PATH, &token);
        self.mailer
            .send(
                &user.email,
                "Verify your email",
                &format!("Confirm your address by opening:\n{link}\n"),
            )
            .await
    }
}

pub struct ConfirmVerificationUseCase<U: UserStore> {
    pub users: U,
    pub codec: TokenCodec,
}

impl<U: UserStore> ConfirmVerificationUseCase<U> {
    /// Stamp the account verified. Replaying an already-used link is Ok:
    /// the stamp is written once and kept.
    pub async fn execute(&self, token: &str) -> Result<(), AuthServiceError> {
        let (user_id, _) = action_token_subject(&self.codec, token, TokenKind::VerifyEmail)?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        if user.email_verified_at.is_none() {
            user.email_verified_at = Some(Utc::now());
            user.updated_at = Utc::now();
            self.users.save(&user).await?;
        }
        Ok(())
    }
}

// ── Password reset ───────────────────────────────────────────────────────────

pub struct ForgotPasswordUseCase<U, M>
where
    U: UserStore,
    M: Mailer,
{
    pub users: U,
    pub mailer: M,
    pub codec: TokenCodec,
    pub frontend_url: String,
}

impl<U, M> ForgotPasswordUseCase<U, M>
where
    U: UserStore,
    M: Mailer,
{
    /// Always Ok, whether or not the address exists.
    pub async fn execute(&self, email: &str) -> Result<(), AuthServiceError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(());
        };

        let (token, _) = self
            .codec
            .issue_reset_password(&user.id.to_string())
            .map_err(signing)?;
        let link = frontend_link(&self.frontend_url, RESET_PASSWORD_PATH, &token);
        self.mailer
            .send(
                &user.email,
                "Reset your password",
                &format!(
                    "A password reset was requested for this account.\n\
                     If that was you, open:\n{link}\n\n\
                     The link expires in one hour.\n"
                ),
            )
            .await
    }
}

pub struct ResetPasswordUseCase<U, T, H>
where
    U: UserStore,
    T: RefreshTokenStore,
    H: PasswordHasher,
{
    pub users: U,
    pub refresh_tokens: T,
    pub hasher: H,
    pub codec: TokenCodec,
}

impl<U, T, H> ResetPasswordUseCase<U, T, H>
where
    U: UserStore,
    T: RefreshTokenStore,
    H: PasswordHasher,
{
    /// Set a new password and log the user out everywhere.
    pub async fn execute(&self, token: &str, new_password: &str) -> Result<(), AuthServiceError> {
        let (user_id, _) = action_token_subject(&self.codec, token, TokenKind::ResetPassword)?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        user.password_hash = self.hasher.hash(new_password)?;
        user.updated_at = Utc::now();
        self.users.save(&user).await?;

        let revoked = self
            .refresh_tokens
            .revoke_all_active_for_user(user.id)
            .await?;
        tracing::info!(user_id = %user.id, revoked, "password reset, sessions revoked");
        Ok(())
    }
}
