use std::collections::BTreeSet;

use gatehouse_auth_types::token::{Claims, TokenCodec, TokenKind};

use crate::domain::repository::{RoleStore, UserStore};
use crate::error::AuthServiceError;

/// Where an authorization check takes its permission set from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PermissionSource {
    /// Trust the permissions embedded in the validated access token.
    /// Cheap, but stale if roles changed after issuance.
    Token,
    /// Recompute from the user's current role assignment.
    Fresh,
}

/// Expands role slugs into effective permission sets.
pub struct RbacResolver<R: RoleStore> {
    pub roles: R,
}

impl<R: RoleStore> RbacResolver<R> {
    /// Union of the permission sets of every role in `slugs`, deduplicated.
    /// Unknown slugs and an empty slug set resolve to the empty set.
    pub async fn permissions_for(
        &self,
        slugs: &[String],
    ) -> Result<BTreeSet<String>, AuthServiceError> {
        if slugs.is_empty() {
            return Ok(BTreeSet::new());
        }
        let roles = self.roles.find_by_slugs(slugs).await?;
        Ok(roles
            .into_iter()
            .flat_map(|role| role.permissions)
            .collect())
    }

    /// Effective permissions for validated access-token claims.
    ///
    /// `Fresh` re-reads the subject's roles from the user store; a vanished
    /// user resolves to no permissions rather than an error.
    pub async fn effective_permissions<U: UserStore>(
        &self,
        claims: &Claims,
        users: &U,
        source: PermissionSource,
    ) -> Result<BTreeSet<String>, AuthServiceError> {
        match source {
            PermissionSource::Token => Ok(claims
                .perms
                .clone()
                .unwrap_or_default()
                .into_iter()
                .collect()),
            PermissionSource::Fresh => {
                let user_id = claims
                    .sub
                    .parse()
                    .map_err(|_| AuthServiceError::Unauthorized)?;
                let roles = match users.find_by_id(user_id).await? {
                    Some(user) => user.roles,
                    None => return Ok(BTreeSet::new()),
                };
                self.permissions_for(&roles).await
            }
        }
    }
}

/// Grant iff every required permission is in the effective set.
/// Exact string membership; no wildcards, no hierarchy.
pub fn authorize(
    required: &[&str],
    effective: &BTreeSet<String>,
) -> Result<(), AuthServiceError> {
    if required.iter().all(|perm| effective.contains(*perm)) {
        Ok(())
    } else {
        Err(AuthServiceError::Forbidden)
    }
}

/// Gate for permission-guarded endpoints.
///
/// Validates the bearer access token, resolves the effective permission set
/// per `source`, and demands every permission in `required`. Bad tokens are
/// `Unauthorized`; an insufficient set is `Forbidden`. Returns the claims so
/// the handler does not decode twice.
pub async fn require_permissions<R, U>(
    codec: &TokenCodec,
    rbac: &RbacResolver<R>,
    users: &U,
    bearer: &str,
    required: &[&str],
    source: PermissionSource,
) -> Result<Claims, AuthServiceError>
where
    R: RoleStore,
    U: UserStore,
{
    let claims = codec
        .validate(bearer)
        .map_err(|_| AuthServiceError::Unauthorized)?;
    if claims.kind != TokenKind::Access {
        return Err(AuthServiceError::Unauthorized);
    }
    let effective = rbac.effective_permissions(&claims, users, source).await?;
    authorize(required, &effective)?;
    Ok(claims)
}
