// Error handling module
// Defines the single error type surfaced by the client

use thiserror::Error;

use crate::models::ApiErrorBody;

/// Errors that can occur while talking to the storefront backend
#[derive(Error, Debug)]
pub enum ClientError {
    /// Network failure before any response was received
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token or login endpoint rejected the credentials
    #[error("Authentication failed: {message}")]
    AuthFailure { status: u16, message: String },

    /// Request stayed unauthorized after the single refresh attempt
    #[error("Unauthorized: {message}")]
    Unauthorized { status: u16, message: String },

    /// Any other non-success response
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Successful status with a body that could not be decoded
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Persisted key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status attached to the error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthFailure { status, .. }
            | ClientError::Unauthorized { status, .. }
            | ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True for 401s that survived the refresh-and-retry path
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized { .. })
    }
}

impl From<rusqlite::Error> for ClientError {
    fn from(err: rusqlite::Error) -> Self {
        ClientError::Storage(err.to_string())
    }
}

/// Message for a non-success response: the body's `message` field when the
/// body is JSON carrying one (then OAuth2 `error_description`, then `error`),
/// otherwise `HTTP error! status: <code>`
pub fn normalize_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|err| {
            [err.message, err.error_description, err.error]
                .into_iter()
                .flatten()
                .find(|msg| !msg.is_empty())
        })
        .unwrap_or_else(|| format!("HTTP error! status: {}", status))
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
