// Storefront API
// High-level customer, order and session operations built on the gateway

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthState, SessionUser, TokenEndpoint, TokenManager};
use crate::config::Config;
use crate::error::{normalize_error_message, ClientError, Result};
use crate::http_client::{build_http_client, join_url, GatewayClient, API_KEY_HEADER};
use crate::models::{Customer, CustomerDetails, LoginRequest, LoginResponse, Order};
use crate::storage::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY};

pub const TOKEN_PATH: &str = "/token";
pub const LOGIN_PATH: &str = "/login";
pub const CUSTOMER_PATH: &str = "/customer";
pub const CUSTOMER_DETAILS_PATH: &str = "/api/v3/customer/details";
pub const ORDERS_PATH: &str = "/orders";

/// Session context for one installation.
/// Construct once at startup and share; there is no global instance.
pub struct StorefrontApi {
    client: Client,
    base_url: String,
    api_key: String,
    store: Arc<dyn KeyValueStore>,
    tokens: Arc<TokenManager>,
    gateway: GatewayClient,
    state: RwLock<AuthState>,
}

impl StorefrontApi {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let client = build_http_client(config)?;

        let tokens = Arc::new(TokenManager::new(
            client.clone(),
            TokenEndpoint {
                url: join_url(&config.api_url, TOKEN_PATH),
                client_id: config.client_id.clone(),
                scope: config.scope.clone(),
            },
            store.clone(),
        ));

        let gateway = GatewayClient::new(
            client.clone(),
            config.api_url.clone(),
            &config.api_key,
            tokens.clone(),
        )?;

        Ok(Self {
            client,
            base_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            store,
            tokens,
            gateway,
            state: RwLock::new(AuthState::Unknown),
        })
    }

    /// Sign in through the OAuth2 password grant.
    ///
    /// Tokens are stored first; the profile is then fetched to build the
    /// session user. A failed profile fetch still leaves the session signed
    /// in with a user derived from the email alone. The session is marked
    /// authenticated as soon as tokens are stored, even if persisting the
    /// user then fails.
    pub async fn sign_in(&self, credentials: &LoginRequest) -> Result<SessionUser> {
        tracing::info!(email = %credentials.email, "Signing in");

        self.tokens
            .exchange_password_grant(&credentials.email, &credentials.password)
            .await?;

        let user = match self.get_customer_details().await {
            Ok(details) => SessionUser::from_details(&details),
            Err(e) => {
                tracing::warn!("Profile fetch after sign-in failed, using fallback user: {}", e);
                SessionUser::fallback(&credentials.email)
            }
        };

        *self.state.write().await = AuthState::Authenticated(user.clone());
        self.store_user(&user)?;

        tracing::info!(user_id = %user.id, "Signed in");
        Ok(user)
    }

    /// Legacy JSON login against `/login`.
    ///
    /// Kept for backends that predate the token endpoint; `sign_in` is the
    /// canonical path. No bearer token is attached and no refresh token is
    /// issued, so sessions from this path cannot be refreshed. A refresh
    /// token left over from an earlier session is discarded.
    pub async fn legacy_login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        tracing::info!(email = %credentials.email, "Signing in via legacy login endpoint");

        let response = self
            .client
            .post(join_url(&self.base_url, LOGIN_PATH))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::AuthFailure {
                status: status.as_u16(),
                message: normalize_error_message(status.as_u16(), &body),
            });
        }

        let result: LoginResponse = serde_json::from_str(&body).map_err(|e| {
            ClientError::MalformedResponse(format!("Failed to parse login response: {}", e))
        })?;

        if !result.token.is_empty() {
            self.store.remove(&[REFRESH_TOKEN_KEY])?;
            self.store.set(ACCESS_TOKEN_KEY, &result.token)?;
            let user = SessionUser::from(result.user.clone());
            self.store_user(&user)?;
            *self.state.write().await = AuthState::Authenticated(user);
        }

        Ok(result)
    }

    pub async fn get_customer_details(&self) -> Result<CustomerDetails> {
        self.gateway.get(CUSTOMER_DETAILS_PATH).await
    }

    pub async fn get_customer(&self) -> Result<Customer> {
        self.gateway.get(CUSTOMER_PATH).await
    }

    pub async fn get_orders(&self) -> Result<Vec<Order>> {
        self.gateway.get(ORDERS_PATH).await
    }

    /// Forget the session locally. The server is not contacted.
    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear()?;
        *self.state.write().await = AuthState::Unauthenticated;
        tracing::info!("Logged out");
        Ok(())
    }

    /// Startup check: a stored token and user mean the session is resumed.
    /// Token validity is only confirmed by the next request.
    pub async fn check_auth_status(&self) -> AuthState {
        let state = match (self.tokens.access_token(), self.stored_user()) {
            (Ok(Some(_)), Ok(Some(user))) => AuthState::Authenticated(user),
            (Ok(_), Ok(_)) => AuthState::Unauthenticated,
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Auth check failed: {}", e);
                AuthState::Unauthenticated
            }
        };

        *self.state.write().await = state.clone();
        state
    }

    /// User persisted by the last login
    pub fn stored_user(&self) -> Result<Option<SessionUser>> {
        match self.store.get(USER_DATA_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| ClientError::Storage(format!("Corrupt user data: {}", e))),
            None => Ok(None),
        }
    }

    pub async fn auth_state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn gateway(&self) -> &GatewayClient {
        &self.gateway
    }

    fn store_user(&self, user: &SessionUser) -> Result<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| ClientError::Storage(format!("Failed to encode user data: {}", e)))?;
        self.store.set(USER_DATA_KEY, &raw)
    }
}
