//! Key-value store abstraction shared by the queue, circuit breaker, and cache.
//!
//! Every structure in this layer (task queue, DLQ, breaker counters, cache
//! entries) lives in a single shared key-value store. Operations are
//! individually atomic point operations; there is no multi-key transaction
//! or lock across them, and callers must tolerate that.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{MeetqError, Result};

/// Store trait for shared key-value storage operations.
///
/// Implementations must be thread-safe (Send + Sync). List operations are
/// FIFO: `push_back` appends to the tail, `pop_front` atomically removes the
/// head so two concurrent poppers never observe the same element.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the value stored under a key, or `None` if absent/expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a key to a value, with an optional time-to-live.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Delete a key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Atomically increment an integer counter, returning the new value.
    /// An absent key counts as 0.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Append a value to the tail of a list.
    async fn push_back(&self, key: &str, value: &str) -> Result<()>;

    /// Atomically remove and return the head of a list, or `None` if empty.
    async fn pop_front(&self, key: &str) -> Result<Option<String>>;

    /// Return list elements in `[start, stop]` (inclusive, negative indexes
    /// count from the tail, Redis LRANGE semantics).
    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Remove the first occurrence of a value from a list.
    /// Returns the number of removed elements (0 or 1).
    async fn list_remove(&self, key: &str, value: &str) -> Result<usize>;

    /// Get the length of a list.
    async fn list_len(&self, key: &str) -> Result<usize>;

    /// Return all keys matching a glob pattern (`*` wildcard).
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;
}

/// A type-erased store handle shared across components.
pub type SharedStore = Arc<dyn Store>;

struct ValueEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl ValueEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[derive(Default)]
struct Inner {
    kv: HashMap<String, ValueEntry>,
    lists: HashMap<String, VecDeque<String>>,
}

/// In-process store implementation.
///
/// Used as the test double and as the degraded mode when no store
/// credentials are configured: every component keeps working against
/// process-local state instead of raising.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create a new empty in-process store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new shared handle to an empty in-process store.
    pub fn shared() -> SharedStore {
        Arc::new(Self::new())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| MeetqError::Store("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.lock()?;
        if inner.kv.get(key).is_some_and(ValueEntry::is_expired) {
            inner.kv.remove(key);
        }
        Ok(inner.kv.get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.lock()?;
        inner.kv.insert(
            key.to_string(),
            ValueEntry {
                value: value.to_string(),
                expires_at: ttl.map(|d| Instant::now() + d),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner.kv.remove(key);
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let mut inner = self.lock()?;
        if inner.kv.get(key).is_some_and(ValueEntry::is_expired) {
            inner.kv.remove(key);
        }
        let current = match inner.kv.get(key) {
            Some(entry) => entry
                .value
                .parse::<i64>()
                .map_err(|e| MeetqError::Store(format!("counter {} not an integer: {}", key, e)))?,
            None => 0,
        };
        let next = current + 1;
        inner.kv.insert(
            key.to_string(),
            ValueEntry {
                value: next.to_string(),
                expires_at: None,
            },
        );
        Ok(next)
    }

    async fn push_back(&self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.lock()?;
        inner
            .lists
            .entry(key.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn pop_front(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.lock()?;
        Ok(inner.lists.get_mut(key).and_then(VecDeque::pop_front))
    }

    async fn list_range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let inner = self.lock()?;
        let Some(list) = inner.lists.get(key) else {
            return Ok(Vec::new());
        };
        let len = list.len() as isize;
        let resolve = |i: isize| -> isize {
            if i < 0 {
                (len + i).max(0)
            } else {
                i
            }
        };
        let start = resolve(start);
        let stop = resolve(stop).min(len - 1);
        if start > stop || start >= len {
            return Ok(Vec::new());
        }
        Ok(list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .cloned()
            .collect())
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<usize> {
        let mut inner = self.lock()?;
        let Some(list) = inner.lists.get_mut(key) else {
            return Ok(0);
        };
        match list.iter().position(|v| v == value) {
            Some(idx) => {
                list.remove(idx);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn list_len(&self, key: &str) -> Result<usize> {
        let inner = self.lock()?;
        Ok(inner.lists.get(key).map_or(0, VecDeque::len))
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut inner = self.lock()?;
        let expired: Vec<String> = inner
            .kv
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            inner.kv.remove(&key);
        }
        Ok(inner
            .kv
            .keys()
            .filter(|k| glob_match(pattern, k))
            .cloned()
            .collect())
    }
}

/// Match a key against a glob pattern supporting the `*` wildcard.
fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }
    let mut rest = key;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match rest.strip_prefix(part) {
                Some(r) => rest = r,
                None => return false,
            }
        } else if i == parts.len() - 1 && !pattern.ends_with('*') {
            return rest.ends_with(part);
        } else {
            match rest.find(part) {
                Some(idx) => rest = &rest[idx + part.len()..],
                None => return false,
            }
        }
    }
    true
}
