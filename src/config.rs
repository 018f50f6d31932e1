//! Configuration management for the ahub CLI and SDK

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AhubError, Result};

/// Persisted CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    pub endpoint: String,
    pub timeout: u64,
    pub verbose: bool,
    pub storage_dir: PathBuf,
    pub download_dir: PathBuf,
    pub token_storage_enabled: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.agenthub.dev/api".to_string(),
            timeout: 30,
            verbose: false,
            storage_dir: default_storage_dir(),
            download_dir: default_download_dir(),
            token_storage_enabled: true,
        }
    }
}

impl HubConfig {
    /// Load config from the default path, creating it on first run.
    pub async fn load() -> Result<Self> {
        Self::load_from(&default_config_path()).await
    }

    pub async fn load_from(config_file: &Path) -> Result<Self> {
        if config_file.exists() {
            let content = fs::read_to_string(config_file).await?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    // Release builds always talk to the production endpoint.
                    #[cfg(not(debug_assertions))]
                    let config = Self {
                        endpoint: Self::default().endpoint,
                        ..config
                    };
                    Ok(config)
                }
                Err(_) => {
                    // Unreadable config is replaced rather than fatal.
                    let config = Self::default();
                    config.save(config_file).await?;
                    Ok(config)
                }
            }
        } else {
            let config = Self::default();
            config.save(config_file).await?;
            Ok(config)
        }
    }

    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    /// Derive the SDK-level client configuration.
    pub fn to_client_config(&self) -> ClientConfig {
        let normalized_endpoint = if self.endpoint.ends_with("/api") {
            self.endpoint.clone()
        } else if self.endpoint.ends_with('/') {
            format!("{}api", self.endpoint)
        } else {
            format!("{}/api", self.endpoint)
        };

        let use_proxy = !normalized_endpoint.contains("localhost")
            && !normalized_endpoint.contains("127.0.0.1");

        let mut builder = ClientConfigBuilder::new()
            .base_url(&normalized_endpoint)
            .timeout(self.timeout)
            .verbose(self.verbose)
            .use_proxy(use_proxy);

        if self.token_storage_enabled {
            let token_path = self.storage_dir.join("tokens").join("session.json");
            let token_config = TokenStorageConfig {
                enabled: true,
                storage_path: Some(token_path.to_string_lossy().to_string()),
                obfuscation_key: None,
            };
            builder = builder.token_storage(token_config);
        }

        builder.build().unwrap_or_else(|_| ClientConfig::default())
    }
}

pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agenthub")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.json")
}

pub fn default_storage_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agenthub")
}

pub fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Token storage configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct TokenStorageConfig {
    #[serde(default)]
    pub enabled: bool,
    pub storage_path: Option<String>,
    pub obfuscation_key: Option<String>,
}

impl From<TokenStorageConfig> for crate::store::TokenStoreConfig {
    fn from(config: TokenStorageConfig) -> Self {
        Self {
            enabled: config.enabled,
            storage_path: config.storage_path.map(PathBuf::from),
            obfuscation_key: config.obfuscation_key,
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub token_storage: TokenStorageConfig,
    #[serde(default = "default_use_proxy")]
    pub use_proxy: bool,
}

fn default_timeout() -> u64 {
    30
}

fn default_use_proxy() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.agenthub.dev/api".to_string(),
            timeout: default_timeout(),
            verbose: false,
            token_storage: TokenStorageConfig::default(),
            use_proxy: default_use_proxy(),
        }
    }
}

/// Builder for ClientConfig
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    base_url: Option<String>,
    timeout: Option<u64>,
    verbose: Option<bool>,
    token_storage: Option<TokenStorageConfig>,
    config_file: Option<PathBuf>,
    use_proxy: Option<bool>,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    pub fn use_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }

    pub fn token_storage(mut self, token_storage: TokenStorageConfig) -> Self {
        self.token_storage = Some(token_storage);
        self
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let mut config = ClientConfig::from_file_and_env(self.config_file.as_deref())?;

        if let Some(base_url) = self.base_url {
            config.base_url = base_url;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(verbose) = self.verbose {
            config.verbose = verbose;
        }
        if let Some(token_storage) = self.token_storage {
            config.token_storage = token_storage;
        }
        if let Some(use_proxy) = self.use_proxy {
            config.use_proxy = use_proxy;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    pub fn from_file_and_env<P: AsRef<Path>>(config_file: Option<P>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("base_url", "https://api.agenthub.dev/api")?
            .set_default("timeout", 30)?
            .set_default("verbose", false)?
            .set_default("use_proxy", true)?;

        if let Some(config_path) = config_file {
            if config_path.as_ref().exists() {
                builder = builder.add_source(File::from(config_path.as_ref()));
            }
        }
        builder = builder.add_source(Environment::with_prefix("AHUB").try_parsing(true));

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(AhubError::invalid_input("Base URL cannot be empty"));
        }
        Ok(())
    }

    pub fn endpoint_url(&self, endpoint: &str) -> String {
        let endpoint = endpoint.strip_prefix('/').unwrap_or(endpoint);
        let base_url =
            if self.base_url.starts_with("http://") || self.base_url.starts_with("https://") {
                self.base_url.clone()
            } else {
                format!("https://{}", self.base_url)
            };

        format!("{}/{}", base_url.trim_end_matches('/'), endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_normalization() {
        let config = ClientConfig {
            base_url: "https://api.agenthub.dev/api/".to_string(),
            ..ClientConfig::default()
        };
        assert_eq!(
            config.endpoint_url("/agents"),
            "https://api.agenthub.dev/api/agents"
        );
        assert_eq!(
            config.endpoint_url("agents/42"),
            "https://api.agenthub.dev/api/agents/42"
        );
    }

    #[test]
    fn test_endpoint_url_adds_scheme() {
        let config = ClientConfig {
            base_url: "api.agenthub.dev/api".to_string(),
            ..ClientConfig::default()
        };
        assert!(config.endpoint_url("/agents").starts_with("https://"));
    }

    #[test]
    fn test_validate_rejects_empty_base_url() {
        let config = ClientConfig {
            base_url: String::new(),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_client_config_appends_api_suffix() {
        let hub = HubConfig {
            endpoint: "http://localhost:8000".to_string(),
            token_storage_enabled: false,
            ..HubConfig::default()
        };
        let client = hub.to_client_config();
        assert_eq!(client.base_url, "http://localhost:8000/api");
        assert!(!client.use_proxy);
    }

    #[tokio::test]
    async fn test_load_creates_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = HubConfig::load_from(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(config.timeout, 30);
    }

    #[test]
    fn test_builder_layers_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(
            &path,
            r#"{"base_url": "http://localhost:9000/api", "timeout": 5}"#,
        )
        .unwrap();

        let config = ClientConfig::builder()
            .config_file(&path)
            .use_proxy(false)
            .build()
            .unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/api");
        assert_eq!(config.timeout, 5);
        assert!(!config.use_proxy);
    }

    #[tokio::test]
    async fn test_load_replaces_corrupt_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let config = HubConfig::load_from(&path).await.unwrap();
        assert_eq!(config.endpoint, HubConfig::default().endpoint);
    }
}
