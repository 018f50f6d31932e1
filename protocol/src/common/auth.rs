//! Authentication-related common types

use serde::{Deserialize, Serialize};

/// Token bundle returned by login and refresh endpoints.
///
/// `expires_in` is minutes for the access token, `refresh_expires_in` hours
/// for the refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub token_type: String,
    pub username: String,
    pub user_id: i64,
}
