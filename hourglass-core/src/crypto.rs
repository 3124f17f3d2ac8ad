//! Cryptographic helpers for tokens and passwords
//!
//! Session tokens and password-reset tokens are 256-bit random values. Only
//! their SHA-256 hash is ever persisted; lookups go through the hash and any
//! comparison against a stored hash is constant time.
//!
//! Passwords are different: they are low-entropy, so they are hashed with
//! Argon2 through the `password-auth` crate.

use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use std::sync::LazyLock;
use subtle::ConstantTimeEq;

/// A real Argon2 hash of a throwaway password, verified against when the
/// account being logged into does not exist.
static DUMMY_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| password_auth::generate_hash("hourglass-dummy-password"));

/// Generate a cryptographically secure random token.
///
/// 32 random bytes encoded as URL-safe base64 without padding (43 characters).
///
/// # Panics
///
/// Panics if the OS random number generator fails. There is no sensible way
/// to continue issuing credentials without an entropy source.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Hex-encoded SHA-256 of `token`, suitable for database lookups.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a token against a stored hash with constant-time comparison.
pub fn verify_token_hash(token: &str, stored_hash: &str) -> bool {
    let computed_hash = hash_token(token);
    constant_time_compare(computed_hash.as_bytes(), stored_hash.as_bytes())
}

/// Constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hash a password for storage (Argon2, PHC string format).
pub fn hash_password(password: &str) -> String {
    password_auth::generate_hash(password)
}

/// Check `password` against a stored PHC hash.
///
/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    password_auth::verify_password(password, stored_hash).is_ok()
}

/// Burn the same amount of work as a real password check.
///
/// Called when the email is unknown so response timing does not reveal which
/// accounts exist.
pub fn dummy_verify_password(password: &str) {
    let _ = password_auth::verify_password(password, &DUMMY_PASSWORD_HASH);
}
