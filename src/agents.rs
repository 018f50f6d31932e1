//! Agent catalog API operations
//!
//! [`AgentApi`] is the seam between catalog/download logic and the backend:
//! the real [`AgentService`] speaks HTTP, tests substitute a mock. Consumers
//! treat the backend as an opaque collaborator and never look past this trait.

use std::path::Path;

use reqwest::Method;
use validator::Validate;

use ahub_protocol::api::{AgentDetailResponse, AgentListResponse, DownloadAgentResponse, SearchAgentsQuery};
use ahub_protocol::Agent;

use crate::client::{ApiResponse, HttpClient};
use crate::error::{AhubError, Result};

/// One page of catalog results.
///
/// The catalog is unpaginated today; `count` is the server-side total and
/// matches `agents.len()`.
#[derive(Debug, Clone, Default)]
pub struct CatalogPage {
    pub agents: Vec<Agent>,
    pub count: usize,
    pub message: Option<String>,
}

impl From<AgentListResponse> for CatalogPage {
    fn from(resp: AgentListResponse) -> Self {
        Self {
            agents: resp.agents,
            count: resp.count,
            message: resp.message,
        }
    }
}

/// Server acknowledgment of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadReceipt {
    pub message: Option<String>,
    pub bytes_written: u64,
}

/// Backend operations the catalog logic consumes.
pub trait AgentApi {
    /// Full or category-filtered catalog listing.
    async fn fetch_agents(&self, category: Option<&str>) -> Result<CatalogPage>;

    /// Free-text search. Supersedes any category filter for this call.
    async fn search_agents(&self, term: &str) -> Result<CatalogPage>;

    /// Single record for the detail view.
    async fn get_agent(&self, id: i64) -> Result<Agent>;

    /// Trigger the server-side download-count increment and transfer the
    /// package file to `dest`.
    async fn download_agent(&self, id: i64, dest: &Path) -> Result<DownloadReceipt>;
}

/// HTTP-backed implementation of [`AgentApi`]
#[derive(Debug)]
pub struct AgentService {
    client: HttpClient,
}

impl AgentService {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    async fn list(&self, endpoint: &str) -> Result<CatalogPage> {
        let response: ApiResponse<AgentListResponse> = self
            .client
            .request::<(), _>(Method::GET, endpoint, None)
            .await?;

        let data = response
            .data
            .ok_or_else(|| AhubError::invalid_response("No data in catalog response"))?;

        Ok(data.into())
    }
}

impl AgentApi for AgentService {
    async fn fetch_agents(&self, category: Option<&str>) -> Result<CatalogPage> {
        let endpoint = match category {
            Some(category) => format!("/agents?category={}", urlencoding::encode(category)),
            None => "/agents".to_string(),
        };
        self.list(&endpoint).await
    }

    async fn search_agents(&self, term: &str) -> Result<CatalogPage> {
        let query = SearchAgentsQuery { q: term.to_string() };
        query
            .validate()
            .map_err(|e| AhubError::validation_field(e.to_string(), "q"))?;

        let endpoint = format!("/agents/search?q={}", urlencoding::encode(term));
        self.list(&endpoint).await
    }

    async fn get_agent(&self, id: i64) -> Result<Agent> {
        let response: ApiResponse<AgentDetailResponse> = self
            .client
            .request::<(), _>(Method::GET, &format!("/agents/{}", id), None)
            .await?;

        let data = response
            .data
            .ok_or_else(|| AhubError::agent_not_found(format!("agent {}", id)))?;

        Ok(data.agent)
    }

    async fn download_agent(&self, id: i64, dest: &Path) -> Result<DownloadReceipt> {
        // The POST is the authoritative acknowledgment: it increments the
        // server-side counter. The file bytes come from a separate GET.
        // Attributed to the session when one exists.
        let endpoint = format!("/agents/{}/download", id);
        let response: ApiResponse<DownloadAgentResponse> = if self.client.is_authenticated() {
            self.client
                .authenticated_request::<(), _>(Method::POST, &endpoint, None)
                .await?
        } else {
            self.client
                .request::<(), _>(Method::POST, &endpoint, None)
                .await?
        };

        let message = response.data.and_then(|d| d.message);

        let bytes = self
            .client
            .base()
            .get_bytes(&format!("/agents/{}/file", id))
            .await?;
        let bytes_written = bytes.len() as u64;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(dest, bytes).await?;

        Ok(DownloadReceipt {
            message,
            bytes_written,
        })
    }
}

/// Local filename for a downloaded package: the basename of the server-side
/// storage path, falling back to the agent name.
pub fn suggested_filename(agent: &Agent) -> String {
    Path::new(&agent.file_path)
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .unwrap_or_else(|| format!("{}.zip", agent.name.replace(' ', "_")))
}
