//! Redis store backend for meetq.
//!
//! Implements the core [`Store`] trait over a Redis keyspace. Every
//! operation maps to a single Redis command, so the atomicity guarantees
//! the core relies on (LPOP head removal, INCR counters) come straight from
//! Redis.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use meetq_redis::RedisStore;
//! use meetq_core::{Keys, TaskQueue};
//!
//! #[tokio::main]
//! async fn main() -> meetq_core::Result<()> {
//!     let store = RedisStore::connect("redis://localhost").await?;
//!     let queue = TaskQueue::new(store, Keys::new("myapp"));
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::Duration;

use meetq_core::{MeetqError, Result, SharedStore, Store};

fn store_err(e: redis::RedisError) -> MeetqError {
    MeetqError::Store(e.to_string())
}

/// Redis-backed shared store.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis and return a shared store handle.
    pub async fn connect(redis_url: &str) -> Result<SharedStore> {
        let client = redis::Client::open(redis_url).map_err(store_err)?;
        let conn = ConnectionManager::new(client).await.map_err(store_err)?;
        Ok(Arc::new(Self { conn }))
    }

    /// Create a store with an existing connection manager.
    pub fn with_connection(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(store_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let mut cmd = redis::cmd("SET");
                cmd.arg(key).arg(value).arg("PX").arg(ttl.as_millis() as u64);
                cmd.query_async::<()>(&mut conn).await.map_err(store_err)
            }
            None => conn.set::<_, _, ()>(key, value).await.map_err(store_err),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(store_err)
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut conn = self.conn.clone();
        conn.incr(key, 1i64).await.map_err(store_err)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(key, value).await.map_err(store_err)
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.lpop(key, None).await.map_err(store_err)
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.lrange(key, start, stop).await.map_err(store_err)
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.lrem(key, 1, value).await.map_err(store_err)?;
        Ok(removed.max(0) as usize)
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let mut conn = self.conn.clone();
        conn.llen(key).await.map_err(store_err)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        conn.keys(pattern).await.map_err(store_err)
    }
}

// ========== Integration Tests (require Redis) ==========
