//! API DTOs module
//!
//! Per-endpoint data transfer objects, organized by domain:
//! - `auth`: login, token refresh, revocation
//! - `agent`: catalog listing, search, detail, download

pub mod agent;
pub mod auth;

pub use agent::*;
pub use auth::*;
