//! Credential hashing and verification.
//!
//! Stored hashes are bcrypt. Accounts created by earlier revisions of the
//! system carry the `$2y$` algorithm marker; the format is otherwise
//! identical to `$2b$`, so verification normalizes the prefix before
//! comparison. Verification fails closed: any malformed hash yields
//! `false`, never an error, and neither the plaintext nor the hash is ever
//! logged.

use bcrypt::{hash, verify, DEFAULT_COST};
use tracing::debug;

use crate::errors::ServiceError;

/// Marker written by the legacy hash implementation.
const LEGACY_PREFIX: &str = "$2y$";
/// Marker the current implementation both writes and verifies.
const CURRENT_PREFIX: &str = "$2b$";

/// Hashes a plaintext password for storage.
pub fn hash_password(plaintext: &str) -> Result<String, ServiceError> {
    hash(plaintext, DEFAULT_COST)
        .map_err(|_| ServiceError::InternalError("password hashing failed".to_string()))
}

/// Verifies a plaintext against a stored hash, accepting both the current
/// and the legacy hash marker. Returns `false` on any malformed input.
pub fn verify_password(plaintext: &str, stored_hash: &str) -> bool {
    let normalized = normalize_legacy_prefix(stored_hash);
    match verify(plaintext, &normalized) {
        Ok(matched) => matched,
        Err(_) => {
            debug!("password verification failed on malformed hash");
            false
        }
    }
}

fn normalize_legacy_prefix(stored_hash: &str) -> String {
    match stored_hash.strip_prefix(LEGACY_PREFIX) {
        Some(rest) => format!("{}{}", CURRENT_PREFIX, rest),
        None => stored_hash.to_string(),
    }
}
