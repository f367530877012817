use std::time::Duration;

use async_trait::async_trait;

use crate::services::cache::CacheError;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Process-wide key/value store behind the auth cookie.
///
/// Calls are single reads/writes; nothing here retries. Callers decide
/// whether a failure means "no user" or a hard error.
#[async_trait]
pub trait SessionStore: Send + Sync {
    // Backend name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn get(&self, key: &str) -> SessionResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> SessionResult<()>;

    // Discard whatever is held under `key` so the session starts over empty.
    async fn restart(&self, key: &str) -> SessionResult<()>;
}
