// Authentication types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CustomerDetails, LoginUser};

/// OAuth2 grant sent to the token endpoint
#[derive(Clone, Copy)]
pub enum Grant<'a> {
    /// Resource owner password credentials
    Password { username: &'a str, password: &'a str },

    /// Exchange of a previously issued refresh token
    RefreshToken(&'a str),
}

impl<'a> Grant<'a> {
    /// Value of the `grant_type` form field
    pub fn grant_type(&self) -> &'static str {
        match self {
            Grant::Password { .. } => "password",
            Grant::RefreshToken(_) => "refresh_token",
        }
    }

    /// Form fields carrying the prior credential
    pub fn credential_params(&self) -> Vec<(&'static str, &'a str)> {
        match *self {
            Grant::Password { username, password } => {
                vec![("username", username), ("password", password)]
            }
            Grant::RefreshToken(token) => vec![("refresh_token", token)],
        }
    }
}

impl std::fmt::Debug for Grant<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grant::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .finish_non_exhaustive(),
            Grant::RefreshToken(_) => f.write_str("RefreshToken(..)"),
        }
    }
}

/// Token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Access/refresh token pair issued by a successful exchange
#[derive(Debug, Clone, PartialEq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl TokenPair {
    /// Absolute expiry, counted from `issued_at`
    pub fn expires_at(&self, issued_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| issued_at + Duration::seconds(secs))
    }
}

/// Denormalized profile held for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl SessionUser {
    /// Project loyalty profile details into a session user
    pub fn from_details(details: &CustomerDetails) -> Self {
        Self {
            id: details.id.to_string(),
            email: details.email.clone().unwrap_or_default(),
            name: details.full_name(),
        }
    }

    /// Placeholder used when the profile could not be fetched after sign-in
    pub fn fallback(email: &str) -> Self {
        Self {
            id: "self".to_string(),
            email: email.to_string(),
            name: email.to_string(),
        }
    }
}

impl From<LoginUser> for SessionUser {
    fn from(user: LoginUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Session state as last computed from storage or a login
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AuthState {
    /// Startup storage check has not completed yet
    #[default]
    Unknown,
    Authenticated(SessionUser),
    Unauthenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated(_))
    }

    pub fn user(&self) -> Option<&SessionUser> {
        match self {
            AuthState::Authenticated(user) => Some(user),
            _ => None,
        }
    }
}
