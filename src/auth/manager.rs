use reqwest::Client;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::grant::{self, TokenEndpoint};
use super::types::{Grant, TokenPair};
use crate::error::Result;
use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};

/// Token manager
/// Exchanges credentials for tokens and keeps them in persisted storage.
/// Storage is the only source of truth; nothing is cached in memory.
pub struct TokenManager {
    /// HTTP client for token requests
    client: Client,

    /// Token endpoint and client registration
    endpoint: TokenEndpoint,

    /// Persisted key-value storage
    store: Arc<dyn KeyValueStore>,

    /// Serializes the read-refresh-persist sequence
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(client: Client, endpoint: TokenEndpoint, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            client,
            endpoint,
            store,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Exchange username/password for a token pair and persist it
    pub async fn exchange_password_grant(&self, username: &str, password: &str) -> Result<TokenPair> {
        let pair = grant::request_token(
            &self.client,
            &self.endpoint,
            Grant::Password { username, password },
        )
        .await?;
        self.persist(&pair)?;
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair and persist it
    pub async fn exchange_refresh_grant(&self, refresh_token: &str) -> Result<TokenPair> {
        let pair =
            grant::request_token(&self.client, &self.endpoint, Grant::RefreshToken(refresh_token))
                .await?;
        self.persist(&pair)?;
        Ok(pair)
    }

    /// Current access token from storage
    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token from storage
    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Write a freshly issued pair. The refresh token is only overwritten when
    /// the response carried one; otherwise the stored one is kept.
    pub fn persist(&self, pair: &TokenPair) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        if let Some(ref refresh_token) = pair.refresh_token {
            self.store.set(REFRESH_TOKEN_KEY, refresh_token)?;
        }
        Ok(())
    }

    /// Remove tokens and the cached user
    pub fn clear(&self) -> Result<()> {
        tracing::debug!("Clearing stored session");
        self.store
            .remove(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY])
    }

    /// Refresh after the server rejected `rejected_token`.
    ///
    /// Concurrent callers queue on one lock. A caller that finds the stored
    /// token already replaced by someone else reuses it without another
    /// exchange. Failures are logged and reported as `None`.
    pub async fn refresh_after_unauthorized(&self, rejected_token: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        let current = match self.access_token() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("Failed to read access token before refresh: {}", e);
                return None;
            }
        };

        if current.is_some() && current.as_deref() != rejected_token {
            tracing::debug!("Access token already refreshed by a concurrent request");
            return current;
        }

        let refresh_token = match self.refresh_token() {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!("No refresh token stored, skipping refresh");
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read refresh token: {}", e);
                return None;
            }
        };

        match self.exchange_refresh_grant(&refresh_token).await {
            Ok(pair) => Some(pair.access_token),
            Err(e) => {
                tracing::warn!("Token refresh failed: {}", e);
                None
            }
        }
    }
}
