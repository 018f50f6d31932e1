//! Authentication module for the ahub SDK
//!
//! Exchanges an API key for an access/refresh token pair and keeps the pair
//! fresh. Also the source of truth for the viewer's identity: the catalog's
//! ownership filter reads the numeric user id and authenticated flag from
//! here and manages nothing itself.

use chrono::{DateTime, Duration, Utc};
use reqwest::Method;

use ahub_protocol::api::{ApiLoginRequest, RefreshTokenRequest, RevokeRefreshTokenRequest};
use ahub_protocol::TokenBundle;

use crate::client::{ApiResponse, BaseClient};
use crate::config::ClientConfig;
use crate::error::{AhubError, Result};
use crate::store::{StoredSession, TokenStore, TokenStoreConfig};

/// The viewer's identity as seen by catalog logic.
///
/// `user_id` is `None` for unauthenticated viewers, which makes the
/// ownership filter inert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Option<i64>,
}

impl Viewer {
    pub fn authenticated(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Authentication client
#[derive(Debug)]
pub struct AuthClient {
    base_client: BaseClient,
    username: Option<String>,
    user_id: Option<i64>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expires_at: Option<DateTime<Utc>>,
    refresh_token_expires_at: Option<DateTime<Utc>>,
    token_store: Option<TokenStore>,
}

impl AuthClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_client = BaseClient::new(config.clone())?;

        let token_store = if config.token_storage.enabled {
            let store_config: TokenStoreConfig = config.token_storage.into();
            Some(TokenStore::new(store_config)?)
        } else {
            None
        };

        let mut auth_client = Self {
            base_client,
            username: None,
            user_id: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            refresh_token_expires_at: None,
            token_store,
        };

        if auth_client.token_store.is_some() {
            auth_client.load_available_session();
        }

        Ok(auth_client)
    }

    pub async fn authenticate(&mut self, api_key: String) -> Result<String> {
        let request = ApiLoginRequest { api_key };

        let response: ApiResponse<TokenBundle> = self
            .base_client
            .request(Method::POST, "/auth/api-login", Some(&request))
            .await?;

        let data = response
            .data
            .ok_or_else(|| AhubError::authentication("No data in authentication response"))?;

        self.adopt_bundle(data.clone());
        self.store_current_session()?;

        Ok(data.access_token)
    }

    pub async fn refresh_token(&mut self) -> Result<String> {
        let refresh_token = self
            .refresh_token
            .as_ref()
            .ok_or_else(|| AhubError::authentication("No refresh token available"))?;

        let request = RefreshTokenRequest {
            refresh_token: refresh_token.clone(),
        };

        let response: ApiResponse<TokenBundle> = self
            .base_client
            .request(Method::POST, "/auth/refresh", Some(&request))
            .await?;

        let data = response
            .data
            .ok_or_else(|| AhubError::authentication("No data in refresh response"))?;

        let access_token = data.access_token.clone();
        self.adopt_bundle(data);
        self.store_current_session()?;

        Ok(access_token)
    }

    /// Return a usable access token, refreshing when the current one is
    /// within a minute of expiry.
    pub async fn get_access_token(&mut self) -> Result<String> {
        if let Some(token) = &self.access_token {
            if let Some(expires_at) = self.token_expires_at {
                if expires_at > Utc::now() + Duration::seconds(60) {
                    return Ok(token.clone());
                }
            }
        }

        if self.refresh_token.is_some() {
            if let Some(refresh_expires_at) = self.refresh_token_expires_at {
                if refresh_expires_at > Utc::now() {
                    if let Ok(token) = self.refresh_token().await {
                        return Ok(token);
                    }
                }
            }
        }

        Err(AhubError::authentication(
            "No valid tokens available. Please run `ahub login`.",
        ))
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    pub fn viewer(&self) -> Viewer {
        if self.is_authenticated() {
            Viewer {
                user_id: self.current_user_id(),
            }
        } else {
            Viewer::anonymous()
        }
    }

    pub fn current_username(&self) -> Option<String> {
        self.username
            .clone()
            .or_else(|| self.token_store.as_ref().and_then(|s| s.get_username()))
    }

    pub fn current_user_id(&self) -> Option<i64> {
        self.user_id
            .or_else(|| self.token_store.as_ref().and_then(|s| s.get_user_id()))
    }

    pub fn clear_tokens(&mut self) {
        self.username = None;
        self.user_id = None;
        self.access_token = None;
        self.refresh_token = None;
        self.token_expires_at = None;
        self.refresh_token_expires_at = None;
    }

    pub async fn logout(&mut self) -> Result<()> {
        if let Some(refresh_token) = self.refresh_token.clone() {
            let _ = self.revoke_refresh_token(&refresh_token).await;
        }

        if let Some(store) = &mut self.token_store {
            store.remove_session()?;
        }

        self.clear_tokens();
        Ok(())
    }

    fn adopt_bundle(&mut self, bundle: TokenBundle) {
        let now = Utc::now();
        self.access_token = Some(bundle.access_token);
        self.refresh_token = Some(bundle.refresh_token);
        self.token_expires_at = Some(now + Duration::minutes(bundle.expires_in));
        self.refresh_token_expires_at = Some(now + Duration::hours(bundle.refresh_expires_in));
        self.username = Some(bundle.username);
        self.user_id = Some(bundle.user_id);
    }

    fn load_available_session(&mut self) {
        let stored = self
            .token_store
            .as_ref()
            .and_then(|store| store.get_session());

        if let Some(session) = stored {
            // Expired refresh tokens are useless; leave the client logged out.
            if session.refresh_token_expires_at > Utc::now() {
                self.username = Some(session.username);
                self.user_id = Some(session.user_id);
                self.access_token = Some(session.access_token);
                self.refresh_token = Some(session.refresh_token);
                self.token_expires_at = Some(session.access_token_expires_at);
                self.refresh_token_expires_at = Some(session.refresh_token_expires_at);
            }
        }
    }

    fn store_current_session(&mut self) -> Result<()> {
        if let Some(store) = &mut self.token_store {
            if let (
                Some(username),
                Some(user_id),
                Some(access_token),
                Some(refresh_token),
                Some(access_expires),
                Some(refresh_expires),
            ) = (
                &self.username,
                self.user_id,
                &self.access_token,
                &self.refresh_token,
                &self.token_expires_at,
                &self.refresh_token_expires_at,
            ) {
                let session = StoredSession {
                    username: username.clone(),
                    user_id,
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                    access_token_expires_at: *access_expires,
                    refresh_token_expires_at: *refresh_expires,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                };

                store.store_session(session)?;
            }
        }
        Ok(())
    }

    async fn revoke_refresh_token(&self, refresh_token: &str) -> Result<()> {
        let request = RevokeRefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };

        if let Some(access_token) = &self.access_token {
            let _: ApiResponse<serde_json::Value> = self
                .base_client
                .request_with_bearer(Method::POST, "/auth/revoke", Some(&request), access_token)
                .await?;
        } else {
            let _: ApiResponse<serde_json::Value> = self
                .base_client
                .request(Method::POST, "/auth/revoke", Some(&request))
                .await?;
        }

        Ok(())
    }
}
