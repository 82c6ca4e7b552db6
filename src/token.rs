//! Download tokens: short-lived, opaque, HMAC-signed.
//!
//! A token binds a verified (license key, email) pair to a time-boxed right
//! to fetch the package file. The payload is base64url JSON and carries an
//! HMAC-SHA256 tag so the embedded fields cannot be tampered with; the
//! quota was already charged when the token was issued, so redemption only
//! re-verifies the sale and the issuance time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Tokens are valid for one hour from issuance.
pub const TOKEN_VALIDITY_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownloadToken {
    pub license_key: String,
    pub email: String,
    pub issued_at: i64,
}

impl DownloadToken {
    pub fn new(license_key: &str, email: &str, issued_at: i64) -> Self {
        Self {
            license_key: license_key.to_string(),
            email: email.to_string(),
            issued_at,
        }
    }

    /// Encode as `base64url(payload).base64url(mac)`.
    pub fn sign(&self, secret: &str) -> Result<String> {
        let payload = serde_json::to_vec(self)
            .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))?;
        let mac = compute_mac(secret, &payload)?;
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(mac)
        ))
    }

    /// Decode and authenticate a token, then check its age against `now`.
    ///
    /// A malformed or tampered token is a BadRequest; a genuine token past
    /// the validity window is TokenExpired.
    pub fn verify(token: &str, secret: &str, now: i64) -> Result<Self> {
        let (payload_b64, mac_b64) = token
            .split_once('.')
            .ok_or_else(|| AppError::BadRequest("Invalid download token".into()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AppError::BadRequest("Invalid download token".into()))?;
        let mac = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| AppError::BadRequest("Invalid download token".into()))?;

        let expected = compute_mac(secret, &payload)?;
        if expected.ct_eq(&mac).unwrap_u8() != 1 {
            return Err(AppError::BadRequest("Invalid download token".into()));
        }

        let decoded: DownloadToken = serde_json::from_slice(&payload)
            .map_err(|_| AppError::BadRequest("Invalid download token".into()))?;

        if now - decoded.issued_at > TOKEN_VALIDITY_SECS {
            return Err(AppError::TokenExpired);
        }

        Ok(decoded)
    }
}

fn compute_mac(secret: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("Invalid token secret".into()))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}
