//! Staff password hashing with Argon2id.
//!
//! Parent accounts have no password (they sign in with magic links), so the
//! verification entry point takes an optional stored hash.

use argon2::{
    Argon2, PasswordHash,
    password_hash::{PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Minimum accepted staff password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 10;

/// Errors that can occur during password operations.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Failed to hash password.
    #[error("failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password.
    #[error("failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Password does not meet the minimum length.
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
}

/// Hashes a staff password using Argon2id.
///
/// ```
/// use nestling_core::auth::hash_password;
///
/// let hash = hash_password("correct horse battery").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Verifies a password against a stored hash.
///
/// Returns `Ok(false)` when the account has no password at all, which is
/// the case for parent accounts.
pub fn verify_password(password: &str, stored_hash: Option<&str>) -> Result<bool, PasswordError> {
    let Some(hash) = stored_hash else {
        return Ok(false);
    };
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("nap-time-is-sacred").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("nap-time-is-sacred", Some(&hash)).unwrap());
        assert!(!verify_password("snack-time", Some(&hash)).unwrap());
    }

    #[test]
    fn test_same_password_different_hashes() {
        let first = hash_password("password-one!").unwrap();
        let second = hash_password("password-one!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            hash_password("short"),
            Err(PasswordError::TooShort)
        ));
    }

    #[test]
    fn test_account_without_password_never_verifies() {
        assert!(!verify_password("anything-at-all", None).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", Some("invalid_hash"));
        assert!(matches!(result, Err(PasswordError::InvalidHash)));
    }
}
