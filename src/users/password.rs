use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::error::UserError;
use crate::users::repo_types::{PublicUser, User};

fn storage_failure(context: &str, e: password_hash::Error) -> UserError {
    error!(error = %e, "{}", context);
    UserError::Storage(anyhow::anyhow!("{}: {}", context, e))
}

/// Argon2id with a fresh random salt; output is a PHC string.
pub fn hash_password(plain: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| storage_failure("hash password", e))
}

/// `Ok(false)` on a plain mismatch. A stored hash that does not parse, or uses
/// parameters argon2 cannot check, is a storage failure.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, UserError> {
    let parsed = PasswordHash::new(stored).map_err(|e| storage_failure("parse stored hash", e))?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(storage_failure("verify stored hash", e)),
    }
}

/// Login check for a row fetched by email.
pub fn check_credentials(user: User, plain: &str) -> Result<PublicUser, UserError> {
    if verify_password(plain, &user.password_hash)? {
        Ok(user.into())
    } else {
        Err(UserError::AuthFailed)
    }
}
