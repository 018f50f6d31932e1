//! HTTP client implementations for the ahub SDK

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use crate::auth::{AuthClient, Viewer};
use crate::config::ClientConfig;
use crate::error::{AhubError, Result};

/// API response wrapper
///
/// Every backend endpoint answers with this envelope; `data` carries the
/// endpoint-specific payload when `success` is true.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

fn parse_envelope<R>(status: u16, body: &str) -> Result<ApiResponse<R>>
where
    R: DeserializeOwned,
{
    match serde_json::from_str::<ApiResponse<R>>(body) {
        Ok(api_response) => {
            if !api_response.success {
                let error_message = api_response
                    .error
                    .or(api_response.message)
                    .unwrap_or_else(|| "Unknown API error".to_string());
                return Err(AhubError::api(status, error_message));
            }
            Ok(api_response)
        }
        Err(_) => Err(AhubError::api(
            status,
            format!("Invalid API response: {}", body),
        )),
    }
}

/// Base HTTP client for API operations
#[derive(Debug, Clone)]
pub struct BaseClient {
    pub(crate) client: Client,
    config: ClientConfig,
}

impl BaseClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut client_builder = Client::builder().timeout(Duration::from_secs(config.timeout));

        if !config.use_proxy {
            client_builder = client_builder.no_proxy();
        }

        let client = client_builder.build()?;

        Ok(Self { client, config })
    }

    pub async fn request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint_url(endpoint);
        tracing::debug!("{} {}", method, url);

        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json");

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let response_text = response.text().await?;

        parse_envelope(status, &response_text)
    }

    pub async fn request_with_bearer<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
        bearer_token: &str,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let url = self.config.endpoint_url(endpoint);

        let mut request_builder = self
            .client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", bearer_token));

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let response_text = response.text().await?;

        parse_envelope(status, &response_text)
    }

    /// Fetch a raw (non-enveloped) body, used for file transfers.
    pub async fn get_bytes(&self, endpoint: &str) -> Result<Vec<u8>> {
        let url = self.config.endpoint_url(endpoint);
        tracing::debug!("GET {} (raw)", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AhubError::api(
                status.as_u16(),
                format!("File transfer failed for {}", endpoint),
            ));
        }

        Ok(response.bytes().await?.to_vec())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

/// HTTP client with authentication support
#[derive(Debug)]
pub struct HttpClient {
    base_client: BaseClient,
    auth_client: std::sync::Mutex<AuthClient>,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_client = BaseClient::new(config.clone())?;
        let auth_client = AuthClient::new(config)?;
        Ok(Self {
            base_client,
            auth_client: std::sync::Mutex::new(auth_client),
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_client.lock().unwrap().is_authenticated()
    }

    /// The viewer identity used by the catalog's ownership filter.
    pub fn viewer(&self) -> Viewer {
        self.auth_client.lock().unwrap().viewer()
    }

    pub fn current_username(&self) -> Option<String> {
        self.auth_client.lock().unwrap().current_username()
    }

    pub fn base(&self) -> &BaseClient {
        &self.base_client
    }

    pub fn config(&self) -> ClientConfig {
        self.base_client.config().clone()
    }

    /// Unauthenticated request to a public endpoint.
    pub async fn request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        self.base_client.request(method, endpoint, payload).await
    }

    pub async fn authenticated_request<T, R>(
        &self,
        method: Method,
        endpoint: &str,
        payload: Option<&T>,
    ) -> Result<ApiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        let access_token = {
            let mut auth_client = self.auth_client.lock().unwrap();
            auth_client.get_access_token().await?
        };

        let url = self.base_client.config().endpoint_url(endpoint);

        let mut request_builder = self
            .base_client
            .client
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", access_token));

        if let Some(data) = payload {
            request_builder = request_builder.json(data);
        }

        let response = request_builder.send().await?;
        let status = response.status().as_u16();
        let response_text = response.text().await?;

        if status == 401 {
            let error_detail = serde_json::from_str::<ApiResponse<R>>(&response_text)
                .ok()
                .and_then(|r| r.error.or(r.message))
                .unwrap_or_else(|| "Authentication failed".to_string());
            return Err(AhubError::authentication(error_detail));
        }

        if status == 403 {
            let error_detail = serde_json::from_str::<ApiResponse<R>>(&response_text)
                .ok()
                .and_then(|r| r.error.or(r.message))
                .unwrap_or_else(|| "Insufficient permissions".to_string());
            return Err(AhubError::authorization(error_detail));
        }

        parse_envelope(status, &response_text)
    }

    pub async fn authenticate(&self, api_key: String) -> Result<String> {
        // Guard held across the await; acceptable because the CLI drives all
        // requests from a single task.
        let mut auth_client = self.auth_client.lock().unwrap();
        auth_client.authenticate(api_key).await
    }

    pub async fn logout(&self) -> Result<()> {
        let mut auth_client = self.auth_client.lock().unwrap();
        auth_client.logout().await
    }
}
