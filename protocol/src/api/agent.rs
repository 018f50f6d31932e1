//! Agent catalog API DTOs
//!
//! DTOs for catalog listing, free-text search, detail lookup, and downloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use crate::common::Agent;

/// Catalog listing response
///
/// Returned by GET /agents (optionally `?category=`) and GET /agents/search.
/// `count` is the server-side total for the query, which equals `agents.len()`
/// while the catalog is unpaginated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentListResponse {
    pub agents: Vec<Agent>,
    pub count: usize,
    pub message: Option<String>,
}

/// Single agent response
///
/// Returned by GET /agents/{id}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDetailResponse {
    pub agent: Agent,
}

/// Free-text search request parameters
///
/// Sent as query parameters to GET /agents/search. A search supersedes any
/// category filter for that call; the two are never combined.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SearchAgentsQuery {
    #[validate(length(min = 1, max = 255))]
    pub q: String,
}

/// Download acknowledgment
///
/// Returned by POST /agents/{id}/download once the server has incremented the
/// download counter. The file bytes come from a follow-up GET /agents/{id}/file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadAgentResponse {
    pub message: Option<String>,
}
