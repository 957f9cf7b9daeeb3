// Persisted key-value storage
// Backends are swappable behind the KeyValueStore trait

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::ClientError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ClientError>;

/// Storage key holding the current access token
pub const ACCESS_TOKEN_KEY: &str = "jwt_token";

/// Storage key holding the current refresh token
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Storage key holding the JSON-encoded session user
pub const USER_DATA_KEY: &str = "user_data";

/// String-to-string storage that survives process restarts
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Insert or overwrite a value
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Remove every listed key; missing keys are ignored
    fn remove(&self, keys: &[&str]) -> StoreResult<()>;
}
