//! Shared API types for the AgentHub marketplace
//!
//! Request and response shapes are split the same way the backend organizes
//! them: `common` holds the records themselves, `api` holds per-endpoint DTOs.

pub mod api;
pub mod common;

pub use common::*;
