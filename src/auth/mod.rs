// Authentication module
// Token exchange, persistence and single-flight refresh

mod grant;
mod manager;
mod types;

pub use grant::TokenEndpoint;
pub use manager::TokenManager;
pub use types::{AuthState, Grant, SessionUser, TokenPair, TokenResponse};
