use anyhow::Context as _;

use crate::domain::repository::PasswordHasher;
use crate::error::AuthServiceError;

/// bcrypt-backed hasher at the library's default cost.
#[derive(Clone, Copy, Debug, Default)]
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, raw: &str) -> Result<String, AuthServiceError> {
        bcrypt::hash(raw, bcrypt::DEFAULT_COST)
            .context("hash password")
            .map_err(AuthServiceError::Internal)
    }

    /// An unparseable stored value (the unusable-password sentinel included)
    /// is just a mismatch.
    fn verify(&self, raw: &str, hash: &str) -> bool {
        bcrypt::verify(raw, hash).unwrap_or(false)
    }
}
