use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::services::{
    cache::{CacheClient, ValkeyClient},
    session::store::{SessionError, SessionResult, SessionStore},
};

/// Valkey-backed session store (Redis protocol).
///
/// Entries expire server-side through `SET .. EX`.
#[derive(Clone)]
pub struct ValkeySessionStore<C: CacheClient> {
    cache: Arc<C>,
    // Key prefix to avoid collisions across environments
    prefix: String,
}

impl ValkeySessionStore<ValkeyClient> {
    pub async fn new(redis_url: &str) -> Result<Self, SessionError> {
        Self::new_with_prefix(redis_url, "appkit:session").await
    }

    pub async fn new_with_prefix(
        redis_url: &str,
        prefix: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let client = ValkeyClient::new(redis_url).await?;

        Ok(Self {
            cache: Arc::new(client),
            prefix: prefix.into(),
        })
    }
}

impl<C: CacheClient> ValkeySessionStore<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, raw: &str) -> String {
        format!("{}:{}", self.prefix, raw)
    }
}

#[async_trait]
impl<C: CacheClient> SessionStore for ValkeySessionStore<C> {
    fn backend_name(&self) -> &'static str {
        self.cache.backend_name()
    }

    async fn get(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.cache.get_string(&self.key(key)).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> SessionResult<()> {
        Ok(self.cache.set_with_ttl(&self.key(key), value, ttl).await?)
    }

    async fn restart(&self, key: &str) -> SessionResult<()> {
        self.cache.del(&self.key(key)).await?;
        Ok(())
    }
}
