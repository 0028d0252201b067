/// Password Hashing and Verification
///
/// Handles password hashing with bcrypt. Salts are random per call and
/// embedded in the hash string, so hashing the same password twice yields
/// different outputs that both verify.

use std::sync::Arc;

use bcrypt::{hash, verify};

use crate::error::AuthError;

/// bcrypt only reads this many bytes of input
pub const BCRYPT_MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt at the given cost
///
/// Passwords longer than 72 bytes are refused rather than truncated.
///
/// # Errors
/// Returns `HashingFailure` if bcrypt rejects the cost or input
pub fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    if password.len() > BCRYPT_MAX_PASSWORD_BYTES {
        return Err(AuthError::HashingFailure(format!(
            "password exceeds {} bytes",
            BCRYPT_MAX_PASSWORD_BYTES
        )));
    }
    hash(password, cost).map_err(|e| AuthError::HashingFailure(e.to_string()))
}

/// Verify a password against its hash
///
/// Input longer than 72 bytes never matches: no stored hash was made from it.
///
/// # Errors
/// Returns `HashingFailure` if the stored hash cannot be parsed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let matches = verify(password, hash).map_err(|e| AuthError::HashingFailure(e.to_string()))?;
    Ok(matches && password.len() <= BCRYPT_MAX_PASSWORD_BYTES)
}

/// Credential verifier bound to a bcrypt cost.
///
/// Keeps a dummy hash at the same cost so a login for an unknown account
/// performs the same amount of work as one with a wrong password.
#[derive(Clone)]
pub struct CredentialVerifier {
    cost: u32,
    dummy_hash: Arc<str>,
}

impl CredentialVerifier {
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let dummy_hash = hash_password("tokenward-dummy-password", cost)?;
        Ok(Self {
            cost,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        hash_password(password, self.cost)
    }

    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        verify_password(password, hash)
    }

    /// Burn one verification against the dummy hash. The result is discarded.
    pub fn verify_dummy(&self, password: &str) {
        let _ = verify_password(password, &self.dummy_hash);
    }
}
