//! Stale-while-revalidate cache over the shared store.
//!
//! Entries carry their write timestamp and are stored with an expiry equal
//! to the stale window. A read inside the fresh window returns immediately;
//! a read inside the stale window returns the cached value and kicks off a
//! detached refresh; anything older is a miss even if the bytes still exist.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::keys::Keys;
use crate::store::SharedStore;
use crate::task::now_ms;

/// Cache entry wire shape: `{data, timestamp}` with the timestamp in
/// Unix milliseconds.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    timestamp: i64,
}

/// Derived cache keys swept by [`Cache::invalidate_user_cache`] in addition
/// to the pattern scan.
const USER_CACHE_SUFFIXES: &[&str] = &["meetings", "quota"];

/// Read-through cache with background revalidation.
#[derive(Clone)]
pub struct Cache {
    store: SharedStore,
    keys: Keys,
}

impl Cache {
    /// Create a cache over the shared store.
    pub fn new(store: SharedStore, keys: Keys) -> Self {
        Self { store, keys }
    }

    /// Stale-while-revalidate read.
    ///
    /// - Miss: call `fetcher`, cache the value, return it.
    /// - Fresh hit (`age <= fresh_ttl`): return the cached value.
    /// - Stale hit (`fresh_ttl < age <= stale_ttl`): return the cached value
    ///   and refresh once in a detached task; refresh failures are logged
    ///   and never reach the caller.
    /// - Older than `stale_ttl`: treated as a miss.
    pub async fn swr<T, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        fresh_ttl: Duration,
        stale_ttl: Duration,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let store_key = self.keys.cache(key);

        let raw = match self.store.get(&store_key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key = %store_key, error = %e, "Cache read failed, fetching directly");
                None
            }
        };

        if let Some(raw) = raw {
            match serde_json::from_str::<CacheEntry<T>>(&raw) {
                Ok(entry) => {
                    let age = now_ms().saturating_sub(entry.timestamp);
                    if age <= fresh_ttl.as_millis() as i64 {
                        return Ok(entry.data);
                    }
                    if age <= stale_ttl.as_millis() as i64 {
                        let store = self.store.clone();
                        tokio::spawn(async move {
                            match fetcher().await {
                                Ok(data) => {
                                    if let Err(e) =
                                        store_entry(&store, &store_key, &data, stale_ttl).await
                                    {
                                        tracing::warn!(key = %store_key, error = %e, "Cache refresh write failed");
                                    } else {
                                        tracing::debug!(key = %store_key, "Cache entry revalidated");
                                    }
                                }
                                Err(e) => {
                                    tracing::warn!(key = %store_key, error = %e, "Background cache refresh failed");
                                }
                            }
                        });
                        return Ok(entry.data);
                    }
                    // Past the stale window: fall through to a fresh fetch.
                }
                Err(e) => {
                    tracing::warn!(key = %store_key, error = %e, "Cache entry unparseable, refetching");
                }
            }
        }

        let data = fetcher().await?;
        if let Err(e) = store_entry(&self.store, &store_key, &data, stale_ttl).await {
            tracing::warn!(key = %store_key, error = %e, "Cache write failed");
        }
        Ok(data)
    }

    /// Read a cached value if it is physically present, ignoring freshness.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = self.store.get(&self.keys.cache(key)).await?;
        match raw {
            Some(raw) => {
                let entry: CacheEntry<T> = serde_json::from_str(&raw)?;
                Ok(Some(entry.data))
            }
            None => Ok(None),
        }
    }

    /// Write a value with the given time-to-live.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        store_entry(&self.store, &self.keys.cache(key), value, ttl).await
    }

    /// Remove a cached value.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(&self.keys.cache(key)).await
    }

    /// Drop every cache entry derived for one owner: the known derived keys
    /// plus a pattern-matched sweep for anything else under their prefix.
    pub async fn invalidate_user_cache(&self, owner_id: &str) -> Result<()> {
        for suffix in USER_CACHE_SUFFIXES {
            let key = self.keys.cache(&format!("user:{}:{}", owner_id, suffix));
            self.store.delete(&key).await?;
        }
        let matched = self.store.scan(&self.keys.cache_user_pattern(owner_id)).await?;
        for key in &matched {
            self.store.delete(key).await?;
        }
        tracing::debug!(owner_id, swept = matched.len(), "User cache invalidated");
        Ok(())
    }
}

async fn store_entry<T: Serialize>(
    store: &SharedStore,
    store_key: &str,
    data: &T,
    ttl: Duration,
) -> Result<()> {
    let raw = serde_json::to_string(&serde_json::json!({
        "data": data,
        "timestamp": now_ms(),
    }))?;
    store.set(store_key, &raw, Some(ttl)).await
}
