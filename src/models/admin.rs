use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: String,
    pub email: String,
    /// Salted hash, never serialized to clients
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: i64,
}

/// An admin login session. The bearer token itself is only returned once at
/// login; the database stores its hash.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub id: String,
    pub admin_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub created_at: i64,
}
