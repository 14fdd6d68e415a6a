//! Read-through cache over a key/value backend (Redis in production).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend: {0}")]
    Backend(String),

    #[error("cache serialization: {0}")]
    Serialization(String),
}

/// Raw string storage with per-key expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError>;
}

#[derive(Debug, Clone)]
pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    pub fn open(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)
            .map_err(|e| CacheError::Backend(format!("invalid URL: {e}")))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(format!("connection failed: {e}")))
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| CacheError::Backend(format!("GET failed: {e}")))
    }

    async fn set_ex(&self, key: &str, value: String, ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .set_ex(key, value, ttl_secs)
            .await
            .map_err(|e| CacheError::Backend(format!("SETEX failed: {e}")))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    key_prefix: String,
}

impl Cache {
    pub fn new(url: &str, key_prefix: impl Into<String>) -> Result<Self, CacheError> {
        Ok(Self::with_store(Arc::new(RedisCacheStore::open(url)?), key_prefix))
    }

    pub fn with_store(store: Arc<dyn CacheStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// output for `ttl`. Failed fetches are not cached.
    ///
    /// Cache failures are logged and surfaced to the caller as `E`.
    pub async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let full_key = self.full_key(key);

        let cached = self.read(&full_key).await.inspect_err(|err| {
            error!(key = %full_key, error = %err, "cache read failed");
        })?;
        if let Some(value) = cached {
            info!(key = %full_key, "cache hit");
            return Ok(value);
        }

        info!(key = %full_key, "cache miss, fetching");
        let value = fetch().await?;

        self.write(&full_key, &value, ttl).await.inspect_err(|err| {
            error!(key = %full_key, error = %err, "cache write failed");
        })?;
        info!(key = %full_key, ttl_secs = ttl.as_secs(), "value cached");

        Ok(value)
    }

    async fn read<T: DeserializeOwned>(&self, full_key: &str) -> Result<Option<T>, CacheError> {
        self.store
            .get(full_key)
            .await?
            .map(|data| {
                serde_json::from_str(&data)
                    .map_err(|e| CacheError::Serialization(format!("deserialize: {e}")))
            })
            .transpose()
    }

    async fn write<T: Serialize>(
        &self,
        full_key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        let data = serde_json::to_string(value)
            .map_err(|e| CacheError::Serialization(format!("serialize: {e}")))?;
        self.store.set_ex(full_key, data, ttl.as_secs().max(1)).await
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{key}", self.key_prefix)
    }
}
