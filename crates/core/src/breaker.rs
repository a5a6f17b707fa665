//! Circuit breaker protecting calls to an unreliable downstream service.
//!
//! State lives in the shared store, keyed by service name, so every process
//! instance observes the same breaker. HALF_OPEN is never stored: it is
//! derived at read time once `reset_timeout` has elapsed since the breaker
//! opened, and the next real call's outcome decides the stored state.
//!
//! Store failures inside the breaker degrade to CLOSED behavior (fail open)
//! rather than blocking calls.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::keys::Keys;
use crate::retry::{self, RetryOptions};
use crate::store::SharedStore;
use crate::task::now_ms;

/// Configuration for a circuit breaker, fixed per protected service.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures before the breaker opens.
    pub failure_threshold: u32,
    /// How long the breaker stays open before allowing a trial call.
    pub reset_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_secs(60),
        }
    }
}

/// Derived breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls pass through.
    Closed,
    /// Calls fail fast without reaching the service.
    Open,
    /// The reset timeout elapsed; one trial call is allowed through.
    HalfOpen,
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, Error)]
pub enum BreakerError<E> {
    /// The breaker is open; the wrapped operation was never invoked.
    #[error("circuit open for service '{0}'")]
    Open(String),
    /// The wrapped operation ran and failed.
    #[error("{0}")]
    Service(E),
}

/// Stored status record. `opened_at` is set only while status is OPEN.
#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    status: StoredStatus,
    #[serde(rename = "openedAt")]
    opened_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
enum StoredStatus {
    #[serde(rename = "CLOSED")]
    Closed,
    #[serde(rename = "OPEN")]
    Open,
}

/// Circuit breaker over the shared store.
#[derive(Clone)]
pub struct CircuitBreaker {
    store: SharedStore,
    keys: Keys,
    service: String,
    config: BreakerConfig,
}

impl CircuitBreaker {
    /// Create a breaker for a named downstream service.
    pub fn new(
        store: SharedStore,
        keys: Keys,
        service: impl Into<String>,
        config: BreakerConfig,
    ) -> Self {
        Self {
            store,
            keys,
            service: service.into(),
            config,
        }
    }

    /// The protected service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Derive the current breaker state from the stored record.
    pub async fn state(&self) -> BreakerState {
        let key = self.keys.breaker_state(&self.service);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Breaker state read failed, treating as closed");
                return BreakerState::Closed;
            }
        };
        let Some(raw) = raw else {
            return BreakerState::Closed;
        };
        let stored: StoredState = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Breaker state unparseable, treating as closed");
                return BreakerState::Closed;
            }
        };
        match stored.status {
            StoredStatus::Closed => BreakerState::Closed,
            StoredStatus::Open => {
                let opened_at = stored.opened_at.unwrap_or(0);
                let elapsed = now_ms().saturating_sub(opened_at);
                if elapsed >= self.config.reset_timeout.as_millis() as i64 {
                    BreakerState::HalfOpen
                } else {
                    BreakerState::Open
                }
            }
        }
    }

    /// Current failure count, for observability and tests.
    pub async fn failure_count(&self) -> i64 {
        let key = self.keys.breaker_failures(&self.service);
        match self.store.get(&key).await {
            Ok(Some(raw)) => raw.parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Record a successful call: reset the failure count and close.
    pub async fn record_success(&self) {
        let failures = self.keys.breaker_failures(&self.service);
        let state = self.keys.breaker_state(&self.service);
        if let Err(e) = self.store.delete(&failures).await {
            tracing::warn!(service = %self.service, error = %e, "Failed to reset breaker failure count");
        }
        if let Err(e) = self.store.delete(&state).await {
            tracing::warn!(service = %self.service, error = %e, "Failed to reset breaker state");
        }
    }

    /// Record a failed call; opens the breaker once the threshold is hit.
    ///
    /// The counter increment is atomic in the store, so concurrent callers
    /// racing through HALF_OPEN still reliably re-open the breaker.
    pub async fn record_failure(&self) {
        let count = match self.store.incr(&self.keys.breaker_failures(&self.service)).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Failed to count breaker failure");
                return;
            }
        };
        if count >= self.config.failure_threshold as i64 {
            let stored = StoredState {
                status: StoredStatus::Open,
                opened_at: Some(now_ms()),
            };
            let raw = match serde_json::to_string(&stored) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(service = %self.service, error = %e, "Failed to serialize breaker state");
                    return;
                }
            };
            if let Err(e) = self
                .store
                .set(&self.keys.breaker_state(&self.service), &raw, None)
                .await
            {
                tracing::warn!(service = %self.service, error = %e, "Failed to open breaker");
                return;
            }
            tracing::warn!(
                service = %self.service,
                failures = count,
                "Circuit breaker opened"
            );
        }
    }

    /// Invoke an operation through the breaker.
    ///
    /// Fails fast with [`BreakerError::Open`] when the breaker is open,
    /// without invoking the operation. A success closes the breaker and
    /// resets its failure count; a failure is counted toward the threshold.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.state().await == BreakerState::Open {
            tracing::warn!(service = %self.service, "Circuit open, rejecting call");
            return Err(BreakerError::Open(self.service.clone()));
        }

        match operation().await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(BreakerError::Service(err))
            }
        }
    }

    /// Like [`execute`](Self::execute), but runs the operation through the
    /// retry primitive first; only the final outcome is counted.
    pub async fn execute_with_retry<T, E, F, Fut>(
        &self,
        operation: F,
        retry_options: &RetryOptions<E>,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        if self.state().await == BreakerState::Open {
            tracing::warn!(service = %self.service, "Circuit open, rejecting call");
            return Err(BreakerError::Open(self.service.clone()));
        }

        let context = format!("breaker:{}", self.service);
        match retry::execute(operation, retry_options, &context).await {
            Ok(value) => {
                self.record_success().await;
                Ok(value)
            }
            Err(err) => {
                self.record_failure().await;
                Err(BreakerError::Service(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn breaker(threshold: u32, reset: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            MemoryStore::shared(),
            Keys::new("test"),
            "ai",
            BreakerConfig {
                failure_threshold: threshold,
                reset_timeout: reset,
            },
        )
    }

    #[tokio::test]
    async fn test_closed_by_default() {
        let breaker = breaker(5, Duration::from_secs(60));
        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert_eq!(breaker.failure_count().await, 0);
    }

    #[tokio::test]
    async fn test_opens_at_threshold() {
        let breaker = breaker(3, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);

        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);
        assert_eq!(breaker.failure_count().await, 3);
    }

    #[tokio::test]
    async fn test_success_resets() {
        let breaker = breaker(2, Duration::from_secs(60));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);

        breaker.record_success().await;
        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert_eq!(breaker.failure_count().await, 0);
    }

    #[tokio::test]
    async fn test_half_open_after_reset_timeout() {
        let breaker = breaker(1, Duration::from_millis(30));
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);
    }

    #[tokio::test]
    async fn test_execute_fails_fast_when_open() {
        let breaker = breaker(2, Duration::from_secs(60));
        for _ in 0..2 {
            let result: Result<(), _> = breaker
                .execute(|| async { Err::<(), _>("downstream error".to_string()) })
                .await;
            assert!(matches!(result, Err(BreakerError::Service(_))));
        }
        assert_eq!(breaker.state().await, BreakerState::Open);

        let calls = AtomicU32::new(0);
        let result: Result<i32, _> = breaker
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<i32, String>(1) }
            })
            .await;
        assert!(matches!(result, Err(BreakerError::Open(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_half_open_trial_success_closes() {
        let breaker = breaker(1, Duration::from_millis(30));
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);

        let result: Result<i32, BreakerError<String>> =
            breaker.execute(|| async { Ok(9) }).await;
        assert_eq!(result.unwrap(), 9);
        assert_eq!(breaker.state().await, BreakerState::Closed);
        assert_eq!(breaker.failure_count().await, 0);
    }

    #[tokio::test]
    async fn test_half_open_trial_failure_reopens() {
        let breaker = breaker(1, Duration::from_millis(30));
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(breaker.state().await, BreakerState::HalfOpen);

        let result: Result<(), _> = breaker
            .execute(|| async { Err::<(), _>("still down".to_string()) })
            .await;
        assert!(matches!(result, Err(BreakerError::Service(_))));
        assert_eq!(breaker.state().await, BreakerState::Open);
    }

    #[tokio::test]
    async fn test_execute_with_retry_counts_final_outcome_once() {
        let breaker = breaker(5, Duration::from_secs(60));
        let calls = AtomicU32::new(0);
        let options = RetryOptions::with_max_attempts(3)
            .initial_delay(Duration::from_millis(1))
            .use_jitter(false);

        let result: Result<i32, _> = breaker
            .execute_with_retry(
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<i32, _>("transient".to_string()) }
                },
                &options,
            )
            .await;

        assert!(matches!(result, Err(BreakerError::Service(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(breaker.failure_count().await, 1);
    }
}
