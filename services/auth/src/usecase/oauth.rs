use chrono::Utc;
use uuid::Uuid;

use gatehouse_auth_types::token::TokenCodec;

use crate::domain::repository::{OAuthLinkStore, RefreshTokenStore, RoleStore, UserStore};
use crate::domain::types::{ClientMeta, IdentityAssertion, OAuthLink, User};
use crate::error::AuthServiceError;
use crate::usecase::rbac::RbacResolver;
use crate::usecase::session::{SessionTokens, open_session};

/// Placeholder stored for provider-created accounts. It is not a valid
/// bcrypt digest, so password login can never succeed against it.
pub const UNUSABLE_PASSWORD_HASH: &str = "!";

#[derive(Debug)]
pub struct OAuthLoginOutput {
    pub user: User,
    pub tokens: SessionTokens,
    /// True when this call created the local account.
    pub signed_up: bool,
}

/// Turns a verified third-party identity assertion into a local session,
/// creating the link (and, when allowed, the account) on first contact.
pub struct OAuthLoginUseCase<U, L, R, T>
where
    U: UserStore,
    L: OAuthLinkStore,
    R: RoleStore,
    T: RefreshTokenStore,
{
    pub users: U,
    pub links: L,
    pub rbac: RbacResolver<R>,
    pub refresh_tokens: T,
    pub codec: TokenCodec,
    pub allow_signup: bool,
}

impl<U, L, R, T> OAuthLoginUseCase<U, L, R, T>
where
    U: UserStore,
    L: OAuthLinkStore,
    R: RoleStore,
    T: RefreshTokenStore,
{
    pub async fn execute(
        &self,
        assertion: IdentityAssertion,
        client: &ClientMeta,
    ) -> Result<OAuthLoginOutput, AuthServiceError> {
        // Non-negotiable, checked before any lookup: an unverified provider
        // email must not reach linking or signup.
        if !assertion.email_verified {
            return Err(AuthServiceError::Forbidden);
        }

        let existing_link = self
            .links
            .find_by_provider_subject(&assertion.provider, &assertion.subject)
            .await?;

        let mut signed_up = false;
        let user = match existing_link {
            Some(link) => self
                .users
                .find_by_id(link.user_id)
                .await?
                // A link pointing at a missing user is a store consistency
                // violation, not a client error.
                .ok_or(AuthServiceError::NotFound)?,
            None => {
                let user = match self.users.find_by_email(&assertion.email).await? {
                    Some(user) => user,
                    None => {
                        if !self.allow_signup {
                            return Err(AuthServiceError::Forbidden);
                        }
                        signed_up = true;
                        self.create_provider_user(&assertion).await?
                    }
                };
                let link = OAuthLink {
                    id: Uuid::new_v4(),
                    provider: assertion.provider.clone(),
                    provider_sub: assertion.subject.clone(),
                    user_id: user.id,
                    email: Some(assertion.email.clone()),
                    name: assertion.name.clone(),
                    picture: assertion.picture.clone(),
                    created_at: Utc::now(),
                };
                self.links.insert(&link).await?;
                user
            }
        };

        if !user.is_active {
            return Err(AuthServiceError::Unauthorized);
        }

        let tokens = open_session(
            &self.rbac,
            &self.refresh_tokens,
            &self.codec,
            &user,
            client,
        )
        .await?;

        tracing::info!(
            user_id = %user.id,
            provider = %assertion.provider,
            signed_up,
            "oauth login"
        );
        Ok(OAuthLoginOutput {
            user,
            tokens,
            signed_up,
        })
    }

    /// Account auto-created from a provider assertion: email already
    /// verified by the provider, no usable password.
    async fn create_provider_user(
        &self,
        assertion: &IdentityAssertion,
    ) -> Result<User, AuthServiceError> {
        let full_name = assertion.name.clone().unwrap_or_else(|| {
            assertion
                .email
                .split('@')
                .next()
                .unwrap_or(assertion.email.as_str())
                .to_owned()
        });
        let mut user = User::new(
            assertion.email.clone(),
            full_name,
            UNUSABLE_PASSWORD_HASH.to_owned(),
        );
        user.email_verified_at = Some(Utc::now());
        self.users.create(&user).await?;
        Ok(user)
    }
}
