//! Hashing for admin passwords and session tokens.
//!
//! Passwords are stored as `salt$hash` with a random per-password salt;
//! session tokens are high-entropy random strings, so a plain digest is
//! enough for their lookup hash.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Hash a low-entropy secret (password) with a fresh random salt.
pub fn hash_secret(secret: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = salted_digest(&salt, secret);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Verify a secret against a stored `salt$hash` value in constant time.
pub fn verify_secret(secret: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    let digest = salted_digest(&salt, secret);
    digest.ct_eq(&expected).unwrap_u8() == 1
}

fn salted_digest(salt: &[u8], secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

/// Generate an opaque session token (hex of 32 random bytes).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Lookup hash for a session token.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"keyfront-session-v1:");
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
