//! Token storage for the ahub SDK

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::error::{AhubError, Result};

/// Stored session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub username: String,
    pub user_id: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Token storage configuration
#[derive(Debug, Clone, Default)]
pub struct TokenStoreConfig {
    pub enabled: bool,
    pub storage_path: Option<PathBuf>,
    pub obfuscation_key: Option<String>,
}

/// Token storage manager
///
/// Persists the current session as JSON on disk. The optional obfuscation key
/// keeps tokens out of casual `cat` output; it is not a security boundary.
#[derive(Debug)]
pub struct TokenStore {
    config: TokenStoreConfig,
    session: Option<StoredSession>,
}

impl TokenStore {
    pub fn new(config: TokenStoreConfig) -> Result<Self> {
        let mut store = Self {
            config,
            session: None,
        };

        if store.config.enabled {
            store.load_session()?;
        }

        Ok(store)
    }

    pub fn store_session(&mut self, session: StoredSession) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = Some(session);
        self.save_session()?;
        Ok(())
    }

    pub fn get_session(&self) -> Option<StoredSession> {
        if !self.config.enabled {
            return None;
        }
        self.session.clone()
    }

    pub fn remove_session(&mut self) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }

        self.session = None;
        self.save_session()?;
        Ok(())
    }

    pub fn get_username(&self) -> Option<String> {
        if !self.config.enabled {
            return None;
        }
        self.session.as_ref().map(|s| s.username.clone())
    }

    pub fn get_user_id(&self) -> Option<i64> {
        if !self.config.enabled {
            return None;
        }
        self.session.as_ref().map(|s| s.user_id)
    }

    fn get_storage_path(&self) -> Result<PathBuf> {
        self.config
            .storage_path
            .clone()
            .ok_or_else(|| AhubError::invalid_input("Token storage path not configured"))
    }

    fn load_session(&mut self) -> Result<()> {
        let path = self.get_storage_path()?;

        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| AhubError::internal(format!("Failed to read token storage: {}", e)))?;

        if content.trim().is_empty() {
            return Ok(());
        }

        let decoded_content = if let Some(key) = &self.config.obfuscation_key {
            self.decode_content(&content, key)?
        } else {
            content
        };

        self.session = serde_json::from_str(&decoded_content)
            .map_err(|e| AhubError::internal(format!("Failed to parse token storage: {}", e)))?;

        Ok(())
    }

    fn save_session(&self) -> Result<()> {
        let path = self.get_storage_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                AhubError::internal(format!("Failed to create storage directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(&self.session)
            .map_err(|e| AhubError::internal(format!("Failed to serialize session: {}", e)))?;

        let final_content = if let Some(key) = &self.config.obfuscation_key {
            self.encode_content(&content, key)
        } else {
            content
        };

        fs::write(&path, final_content)
            .map_err(|e| AhubError::internal(format!("Failed to write token storage: {}", e)))?;

        Ok(())
    }

    fn encode_content(&self, content: &str, key: &str) -> String {
        let key_bytes = key.as_bytes();
        let obfuscated: Vec<u8> = content
            .as_bytes()
            .iter()
            .enumerate()
            .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
            .collect();

        base64::engine::general_purpose::STANDARD.encode(obfuscated)
    }

    fn decode_content(&self, encoded_content: &str, key: &str) -> Result<String> {
        let encoded_bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded_content)
            .map_err(|e| AhubError::internal(format!("Failed to decode token storage: {}", e)))?;

        let key_bytes = key.as_bytes();
        let decoded: Vec<u8> = encoded_bytes
            .iter()
            .enumerate()
            .map(|(i, &byte)| byte ^ key_bytes[i % key_bytes.len()])
            .collect();

        String::from_utf8(decoded)
            .map_err(|e| AhubError::internal(format!("Token storage is not valid UTF-8: {}", e)))
    }
}
