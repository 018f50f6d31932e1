//! Agent catalog records

use serde::{Deserialize, Serialize};

/// One catalog entry: an uploadable/downloadable agent package.
///
/// `created_at` is carried as the raw ISO-8601 string the backend sends.
/// Legacy rows can hold values chrono refuses to parse, so interpretation is
/// deferred to the consumer instead of failing deserialization here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    pub author_name: String,
    /// Uploading account, `None` for unattributed/legacy entries.
    pub user_id: Option<i64>,
    /// Server-side storage path, opaque to clients.
    pub file_path: String,
    pub file_size: u64,
    pub download_count: u64,
    pub created_at: String,
}
