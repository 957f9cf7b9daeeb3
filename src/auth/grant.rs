// Token endpoint exchange

use chrono::Utc;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

use super::types::{Grant, TokenPair, TokenResponse};
use crate::error::{normalize_error_message, ClientError, Result};

/// Static parameters of the token endpoint
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    pub url: String,
    pub client_id: String,
    pub scope: Option<String>,
}

impl TokenEndpoint {
    /// Form body for `grant`; both grants share every field but the credential
    pub fn form<'a>(&'a self, grant: &Grant<'a>) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("grant_type", grant.grant_type())];
        form.extend(grant.credential_params());
        form.push(("client_id", self.client_id.as_str()));
        if let Some(scope) = self.scope.as_deref() {
            form.push(("scope", scope));
        }
        form
    }
}

/// Exchange `grant` for a token pair
pub async fn request_token(
    client: &Client,
    endpoint: &TokenEndpoint,
    grant: Grant<'_>,
) -> Result<TokenPair> {
    tracing::debug!(
        url = %endpoint.url,
        grant_type = grant.grant_type(),
        client_id = %endpoint.client_id,
        "Requesting token"
    );

    let response = client
        .post(&endpoint.url)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(ACCEPT, "application/json")
        .form(&endpoint.form(&grant))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(
            status = status.as_u16(),
            grant_type = grant.grant_type(),
            "Token exchange rejected"
        );
        return Err(ClientError::AuthFailure {
            status: status.as_u16(),
            message: normalize_error_message(status.as_u16(), &body),
        });
    }

    let data: TokenResponse = serde_json::from_str(&body).map_err(|e| {
        ClientError::MalformedResponse(format!("Failed to parse token response: {}", e))
    })?;

    let access_token = match data.access_token {
        Some(token) if !token.is_empty() => token,
        _ => {
            return Err(ClientError::AuthFailure {
                status: status.as_u16(),
                message: "Token response does not contain access_token".to_string(),
            })
        }
    };

    let pair = TokenPair {
        access_token,
        refresh_token: data.refresh_token.filter(|t| !t.is_empty()),
        expires_in: data.expires_in,
        token_type: data.token_type,
        scope: data.scope,
    };

    match pair.expires_at(Utc::now()) {
        Some(expires_at) => tracing::info!(
            "Token issued via {} grant, expires: {}",
            grant.grant_type(),
            expires_at.to_rfc3339()
        ),
        None => tracing::info!("Token issued via {} grant", grant.grant_type()),
    }

    Ok(pair)
}
