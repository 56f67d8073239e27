//! # Password Hashing
//!
//! Argon2id with a random salt per hash, stored as a PHC string. Hashing
//! and verification are CPU-heavy, so request handlers call the `_blocking`
//! wrappers which move the work onto tokio's blocking pool.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Minimum accepted password length in characters.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Maximum accepted password length in characters.
pub const MAX_PASSWORD_LEN: usize = 128;

/// Errors from hashing or parsing stored hashes.
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("password must be between {MIN_PASSWORD_LEN} and {MAX_PASSWORD_LEN} characters")]
    InvalidLength,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::InvalidLength => AppError::Validation(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

/// Check the password length policy.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        Err(PasswordError::InvalidLength)
    }
}

/// Hash a password into an Argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    validate_password(password)?;
    let salt = SaltString::generate(&mut rand_core::OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Check a password against a stored PHC string.
pub fn verify_password(password: &str, phc: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Hash on the blocking pool.
pub async fn hash_password_blocking(password: Zeroizing<String>) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(AppError::from)
}

/// Verify on the blocking pool.
///
/// With no stored hash (unknown account) a throwaway hash is still computed
/// so the response time does not reveal whether the account exists.
pub async fn verify_password_blocking(
    password: Zeroizing<String>,
    phc: Option<String>,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || match phc {
        Some(phc) => verify_password(&password, &phc),
        None => {
            let salt = SaltString::generate(&mut rand_core::OsRng);
            let _ = Argon2::default().hash_password(password.as_bytes(), &salt);
            Ok(false)
        }
    })
    .await
    .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))?
    .map_err(AppError::from)
}
