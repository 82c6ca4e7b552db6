use serde::{Deserialize, Serialize};

/// One (license key, normalized domain) claim in the activation ledger.
///
/// Composite-unique on (license_key, domain); re-activation updates the
/// existing row. Rows are flipped inactive on deactivation, never deleted,
/// so the ledger doubles as an audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseActivation {
    pub id: String,
    pub license_key: String,
    /// Normalized: scheme and leading `www.` stripped, lowercased
    pub domain: String,
    pub is_active: bool,
    pub created_at: i64,
    pub last_seen_at: i64,
}

/// Outcome of the activation decision for (key, domain).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The pair is now active (new claim or idempotent re-validation)
    Activated,
    /// A single-domain license is already active on another domain
    Conflict { activated_domain: String },
}
