//! Authentication API DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::TokenBundle;

/// API key-based login request
///
/// Used for POST /auth/api-login. Keys look like `ak-{random}`; the length
/// bounds mirror the database column limit.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApiLoginRequest {
    #[validate(length(min = 10, max = 255))]
    pub api_key: String,
}

/// Login response
pub type ApiLoginResponse = TokenBundle;

/// Refresh access token request
///
/// Used for POST /auth/refresh.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 10, max = 255))]
    pub refresh_token: String,
}

/// Refresh token response
pub type RefreshTokenResponse = TokenBundle;

/// Revoke refresh token request
///
/// Used for POST /auth/revoke.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RevokeRefreshTokenRequest {
    #[validate(length(min = 10, max = 255))]
    pub refresh_token: String,
}
