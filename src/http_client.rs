use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::{normalize_error_message, ClientError, Result};

/// Header carrying the storefront API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Build the shared HTTP client. Timeouts are only set when configured.
pub fn build_http_client(config: &Config) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = config.http_connect_timeout {
        builder = builder.connect_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = config.http_request_timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Join `path` onto `base` with exactly one `/`; absolute URLs pass through
pub fn join_url(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Overlay `extra` on `base`; values from `extra` win on conflict
pub fn merge_headers(base: &mut HeaderMap, extra: &HeaderMap) {
    for name in extra.keys() {
        base.remove(name);
        for value in extra.get_all(name) {
            base.append(name.clone(), value.clone());
        }
    }
}

/// Authenticated request gateway
/// Attaches API key and bearer token, refreshes once on 401
pub struct GatewayClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Backend base URL
    base_url: String,

    /// Value sent as X-API-Key
    api_key: HeaderValue,

    /// Token lifecycle
    tokens: Arc<TokenManager>,
}

impl GatewayClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: &str,
        tokens: Arc<TokenManager>,
    ) -> Result<Self> {
        let api_key = HeaderValue::from_str(api_key)
            .map_err(|_| ClientError::Config("API key is not a valid header value".to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key,
            tokens,
        })
    }

    /// Absolute URL for `path`
    pub fn resolve_url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    /// Default headers plus the bearer token when one is stored.
    /// Returns the token that was attached.
    pub fn auth_headers(&self) -> Result<(HeaderMap, Option<String>)> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(API_KEY_HEADER), self.api_key.clone());

        let token = self.tokens.access_token()?;
        if let Some(ref token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
                ClientError::Storage("Stored access token is not a valid header value".to_string())
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok((headers, token))
    }

    /// Issue a request, refreshing and replaying it once on 401.
    ///
    /// The returned response may carry any status. A 401 that could not be
    /// recovered is returned as the original response.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        extra_headers: &HeaderMap,
    ) -> Result<Response> {
        let url = self.resolve_url(path);
        let mut may_retry = true;

        loop {
            let (mut headers, sent_token) = self.auth_headers()?;
            merge_headers(&mut headers, extra_headers);

            tracing::debug!(
                method = %method,
                url = %url,
                authenticated = sent_token.is_some(),
                "Sending HTTP request"
            );

            let mut request = self.client.request(method.clone(), &url).headers(headers);
            if let Some(ref body) = body {
                request = request.body(body.clone());
            }

            let response = request.send().await.map_err(|e| {
                tracing::warn!(error = %e, url = %url, "HTTP request error");
                ClientError::Transport(e)
            })?;

            let status = response.status();
            tracing::debug!(status = %status, "Received HTTP response");

            if status != StatusCode::UNAUTHORIZED || !may_retry {
                return Ok(response);
            }
            may_retry = false;

            match self.tokens.refresh_token() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!("Received 401 with no refresh token stored");
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!("Failed to read refresh token after 401: {}", e);
                    return Ok(response);
                }
            }

            tracing::warn!("Received 401, refreshing token and retrying...");
            match self
                .tokens
                .refresh_after_unauthorized(sent_token.as_deref())
                .await
            {
                Some(_) => continue,
                None => return Ok(response),
            }
        }
    }

    /// Send and decode a JSON response
    pub async fn request_json<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        extra_headers: &HeaderMap,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ClientError::MalformedResponse(format!("Failed to encode body: {}", e)))?;

        let response = self.send(method, path, body, extra_headers).await?;
        handle_response(response).await
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json::<(), T>(Method::GET, path, None, &HeaderMap::new())
            .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request_json(Method::POST, path, Some(body), &HeaderMap::new())
            .await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.request_json(Method::PUT, path, Some(body), &HeaderMap::new())
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json::<(), T>(Method::DELETE, path, None, &HeaderMap::new())
            .await
    }

    /// Get the underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a gateway response into `T`, or into the normalized error
pub async fn handle_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().clone();
    let body = response.text().await?;

    if !status.is_success() {
        let message = normalize_error_message(status.as_u16(), &body);
        tracing::error!(
            status = status.as_u16(),
            url = %url,
            message = %message,
            "HTTP request failed with error response"
        );

        return Err(if status == StatusCode::UNAUTHORIZED {
            ClientError::Unauthorized {
                status: status.as_u16(),
                message,
            }
        } else {
            ClientError::Http {
                status: status.as_u16(),
                message,
            }
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(url = %url, error = %e, "Failed to decode response body");
        ClientError::MalformedResponse(e.to_string())
    })
}
