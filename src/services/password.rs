//! Password hashing.
//!
//! Argon2id with a random salt per hash. The PHC output string carries the algorithm,
//! parameters and salt, so no separate salt column is needed.
//!
//! Rows written before the switch hold bcrypt strings (`$2a$`, `$2b$`, `$2y$`). Those still
//! verify; new hashes are always argon2.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("password hashing failed")]
    HashingFailed,
    #[error("password does not match")]
    Mismatch,
    #[error("stored password hash is not recognized")]
    InvalidHash,
}

// Verified against on the unknown-user login branch so that branch costs one real verify.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("dummy-password-for-timing").ok());

/// Hash a plaintext password. Two calls with the same input produce different outputs.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| PasswordError::HashingFailed)
}

/// Verify a plaintext against a stored hash. The digest comparison is constant-time.
pub fn verify_password(password: &str, stored: &str) -> Result<(), PasswordError> {
    if stored.starts_with("$2") {
        return verify_bcrypt(password, stored);
    }
    verify_argon2(password, stored)
}

fn verify_argon2(password: &str, phc: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(phc).map_err(|_| PasswordError::InvalidHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|e| match e {
            argon2::password_hash::Error::Password => PasswordError::Mismatch,
            _ => PasswordError::InvalidHash,
        })
}

fn verify_bcrypt(password: &str, hash: &str) -> Result<(), PasswordError> {
    match bcrypt::verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        Err(_) => Err(PasswordError::InvalidHash),
    }
}

/// Spend one verification's worth of work without a real user.
pub fn burn_verify(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}
