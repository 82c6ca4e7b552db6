use serde::{Deserialize, Serialize};

/// One download issuance. Append-only audit trail; rows are never mutated
/// or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Download {
    pub id: String,
    pub sale_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub downloaded_at: i64,
}

#[derive(Debug)]
pub struct CreateDownload<'a> {
    pub sale_id: &'a str,
    pub file_name: &'a str,
    pub file_path: &'a str,
    pub file_size: i64,
    pub ip_address: Option<&'a str>,
    pub user_agent: Option<&'a str>,
}
