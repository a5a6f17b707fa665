//! Generic retry with exponential backoff and jitter.
//!
//! Jitter keeps many callers that failed at the same instant from retrying
//! in lockstep against a recovering downstream.

use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Predicate deciding whether an error is worth retrying.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Options for [`execute`].
#[derive(Clone)]
pub struct RetryOptions<E> {
    /// Total number of attempts, including the first. 1 means no retries.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
    /// Perturb each grown delay by a uniform factor in [0.9, 1.0].
    pub use_jitter: bool,
    /// Optional classifier; a `false` result propagates the error
    /// immediately without further attempts.
    pub is_retryable: Option<RetryPredicate<E>>,
}

impl<E> Default for RetryOptions<E> {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_factor: 2.0,
            use_jitter: true,
            is_retryable: None,
        }
    }
}

impl<E> RetryOptions<E> {
    /// Create options with the given attempt budget.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the upper bound on any single delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Enable or disable jitter.
    pub fn use_jitter(mut self, jitter: bool) -> Self {
        self.use_jitter = jitter;
        self
    }

    /// Set the retryability classifier.
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Some(Arc::new(predicate));
        self
    }
}

/// Execute an operation with bounded retries and exponential backoff.
///
/// Delay schedule: the first retry waits `initial_delay`; each subsequent
/// delay is `min(previous * backoff_factor * jitter, max_delay)`. The last
/// error is returned unchanged once attempts are exhausted; it is never
/// wrapped.
pub async fn execute<T, E, F, Fut>(
    mut operation: F,
    options: &RetryOptions<E>,
    context: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = options.initial_delay;
    let mut attempt: u32 = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= options.max_attempts.max(1) {
                    tracing::error!(
                        context,
                        attempts = attempt,
                        error = %err,
                        "All retry attempts exhausted"
                    );
                    return Err(err);
                }
                if let Some(is_retryable) = &options.is_retryable {
                    if !is_retryable(&err) {
                        tracing::warn!(context, error = %err, "Error not retryable, giving up");
                        return Err(err);
                    }
                }

                tracing::warn!(
                    context,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Operation failed, retrying after delay"
                );
                tokio::time::sleep(delay).await;

                let jitter = if options.use_jitter {
                    rand::thread_rng().gen_range(0.9..=1.0)
                } else {
                    1.0
                };
                delay = delay
                    .mul_f64(options.backoff_factor * jitter)
                    .min(options.max_delay);
                attempt += 1;
            }
        }
    }
}
