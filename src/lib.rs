// Storefront Client - Library root

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod storage;

pub use api::StorefrontApi;
pub use auth::{AuthState, SessionUser, TokenManager, TokenPair};
pub use config::Config;
pub use error::{ClientError, Result};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
