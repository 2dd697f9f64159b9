use anyhow::Context as _;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    sea_query::Expr,
};
use uuid::Uuid;

use gatehouse_auth_schema::{oauth_links, refresh_tokens, roles, users};

use crate::domain::repository::{OAuthLinkStore, RefreshTokenStore, RoleStore, UserStore};
use crate::domain::types::{OAuthLink, RefreshTokenRecord, Role, User};
use crate::error::AuthServiceError;

fn conflict_or_internal(e: sea_orm::DbErr, what: &'static str) -> AuthServiceError {
    match e.sql_err() {
        Some(sea_orm::SqlErr::UniqueConstraintViolation(_)) => AuthServiceError::Conflict,
        _ => AuthServiceError::Internal(anyhow::Error::new(e).context(what)),
    }
}

fn json_slugs(value: sea_orm::JsonValue, what: &'static str) -> Result<Vec<String>, AuthServiceError> {
    serde_json::from_value(value)
        .context(what)
        .map_err(AuthServiceError::Internal)
}

// ── User store ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbUserStore {
    pub db: DatabaseConnection,
}

fn user_from_model(model: users::Model) -> Result<User, AuthServiceError> {
    Ok(User {
        id: model.id,
        email: model.email,
        full_name: model.full_name,
        password_hash: model.password_hash,
        is_active: model.is_active,
        email_verified_at: model.email_verified_at,
        roles: json_slugs(model.roles, "decode user roles")?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl UserStore for DbUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthServiceError> {
        let model = users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&self.db)
            .await
            .context("find user by email")?;
        model.map(user_from_model).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthServiceError> {
        let model = users::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find user by id")?;
        model.map(user_from_model).transpose()
    }

    async fn list(&self) -> Result<Vec<User>, AuthServiceError> {
        let models = users::Entity::find()
            .all(&self.db)
            .await
            .context("list users")?;
        models.into_iter().map(user_from_model).collect()
    }

    async fn create(&self, user: &User) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            full_name: Set(user.full_name.clone()),
            password_hash: Set(user.password_hash.clone()),
            is_active: Set(user.is_active),
            email_verified_at: Set(user.email_verified_at),
            roles: Set(serde_json::json!(user.roles)),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_or_internal(e, "create user"))?;
        Ok(())
    }

    async fn save(&self, user: &User) -> Result<(), AuthServiceError> {
        users::ActiveModel {
            id: Set(user.id),
            email: Set(user.email.clone()),
            full_name: Set(user.full_name.clone()),
            password_hash: Set(user.password_hash.clone()),
            is_active: Set(user.is_active),
            email_verified_at: Set(user.email_verified_at),
            roles: Set(serde_json::json!(user.roles)),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .update(&self.db)
        .await
        .context("save user")?;
        Ok(())
    }
}

// ── Role store ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRoleStore {
    pub db: DatabaseConnection,
}

fn role_from_model(model: roles::Model) -> Result<Role, AuthServiceError> {
    Ok(Role {
        slug: model.slug,
        permissions: json_slugs(model.permissions, "decode role permissions")?,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

impl RoleStore for DbRoleStore {
    async fn find_by_slugs(&self, slugs: &[String]) -> Result<Vec<Role>, AuthServiceError> {
        let models = roles::Entity::find()
            .filter(roles::Column::Slug.is_in(slugs.iter().cloned()))
            .all(&self.db)
            .await
            .context("find roles by slugs")?;
        models.into_iter().map(role_from_model).collect()
    }
}

// ── Refresh-token store ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRefreshTokenStore {
    pub db: DatabaseConnection,
}

fn record_from_model(model: refresh_tokens::Model) -> RefreshTokenRecord {
    RefreshTokenRecord {
        jti: model.jti,
        user_id: model.user_id,
        token_hash: model.token_hash,
        user_agent: model.user_agent,
        ip: model.ip,
        expires_at: model.expires_at,
        revoked_at: model.revoked_at,
        created_at: model.created_at,
    }
}

impl RefreshTokenStore for DbRefreshTokenStore {
    async fn insert(&self, record: &RefreshTokenRecord) -> Result<(), AuthServiceError> {
        refresh_tokens::ActiveModel {
            jti: Set(record.jti),
            user_id: Set(record.user_id),
            token_hash: Set(record.token_hash.clone()),
            user_agent: Set(record.user_agent.clone()),
            ip: Set(record.ip.clone()),
            expires_at: Set(record.expires_at),
            revoked_at: Set(record.revoked_at),
            created_at: Set(record.created_at),
        }
        .insert(&self.db)
        .await
        .context("insert refresh token record")?;
        Ok(())
    }

    async fn find_active_by_jti(
        &self,
        jti: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, AuthServiceError> {
        let now = Utc::now();
        let model = refresh_tokens::Entity::find_by_id(jti)
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .filter(refresh_tokens::Column::ExpiresAt.gt(now))
            .one(&self.db)
            .await
            .context("find active refresh token")?;
        Ok(model.map(record_from_model))
    }

    async fn revoke_if_active(&self, jti: Uuid) -> Result<bool, AuthServiceError> {
        // Single conditional UPDATE: of any number of concurrent callers,
        // exactly one observes rows_affected == 1.
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(Utc::now()))
            .filter(refresh_tokens::Column::Jti.eq(jti))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .exec(&self.db)
            .await
            .context("revoke refresh token")?;
        Ok(result.rows_affected > 0)
    }

    async fn revoke_all_active_for_user(&self, user_id: Uuid) -> Result<u64, AuthServiceError> {
        let now = Utc::now();
        let result = refresh_tokens::Entity::update_many()
            .col_expr(refresh_tokens::Column::RevokedAt, Expr::value(now))
            .filter(refresh_tokens::Column::UserId.eq(user_id))
            .filter(refresh_tokens::Column::RevokedAt.is_null())
            .filter(refresh_tokens::Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await
            .context("revoke all refresh tokens for user")?;
        Ok(result.rows_affected)
    }
}

// ── OAuth link store ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOAuthLinkStore {
    pub db: DatabaseConnection,
}

fn link_from_model(model: oauth_links::Model) -> OAuthLink {
    OAuthLink {
        id: model.id,
        provider: model.provider,
        provider_sub: model.provider_sub,
        user_id: model.user_id,
        email: model.email,
        name: model.name,
        picture: model.picture,
        created_at: model.created_at,
    }
}

impl OAuthLinkStore for DbOAuthLinkStore {
    async fn find_by_provider_subject(
        &self,
        provider: &str,
        provider_sub: &str,
    ) -> Result<Option<OAuthLink>, AuthServiceError> {
        let model = oauth_links::Entity::find()
            .filter(oauth_links::Column::Provider.eq(provider))
            .filter(oauth_links::Column::ProviderSub.eq(provider_sub))
            .one(&self.db)
            .await
            .context("find oauth link")?;
        Ok(model.map(link_from_model))
    }

    async fn insert(&self, link: &OAuthLink) -> Result<(), AuthServiceError> {
        oauth_links::ActiveModel {
            id: Set(link.id),
            provider: Set(link.provider.clone()),
            provider_sub: Set(link.provider_sub.clone()),
            user_id: Set(link.user_id),
            email: Set(link.email.clone()),
            name: Set(link.name.clone()),
            picture: Set(link.picture.clone()),
            created_at: Set(link.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_or_internal(e, "insert oauth link"))?;
        Ok(())
    }
}
