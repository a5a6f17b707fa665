//! Worker pass configuration.

use std::time::Duration;

/// Budgets for a single worker pass.
///
/// A pass holds no state across invocations besides what is in the
/// queue/DLQ; these budgets bound how much one invocation may do.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of tasks dispatched per pass.
    pub max_tasks: usize,
    /// Wall-clock budget per pass; remaining tasks are deferred, not lost.
    pub max_duration: Duration,
    /// Failures a task may accumulate before moving to the DLQ.
    pub max_retries: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_tasks: 5,
            max_duration: Duration::from_secs(50),
            max_retries: 3,
        }
    }
}

impl WorkerConfig {
    /// Create a new builder with default values.
    pub fn builder() -> WorkerConfigBuilder {
        WorkerConfigBuilder::default()
    }
}

/// Builder for [`WorkerConfig`].
#[derive(Debug, Default)]
pub struct WorkerConfigBuilder {
    config: WorkerConfig,
}

impl WorkerConfigBuilder {
    /// Set the maximum number of tasks per pass.
    pub fn max_tasks(mut self, max_tasks: usize) -> Self {
        self.config.max_tasks = max_tasks;
        self
    }

    /// Set the wall-clock budget per pass.
    pub fn max_duration(mut self, max_duration: Duration) -> Self {
        self.config.max_duration = max_duration;
        self
    }

    /// Set the per-task retry budget.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Build the config.
    pub fn build(self) -> WorkerConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.max_tasks, 5);
        assert_eq!(config.max_duration, Duration::from_secs(50));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_builder() {
        let config = WorkerConfig::builder()
            .max_tasks(2)
            .max_duration(Duration::from_secs(10))
            .max_retries(1)
            .build();
        assert_eq!(config.max_tasks, 2);
        assert_eq!(config.max_duration, Duration::from_secs(10));
        assert_eq!(config.max_retries, 1);
    }
}
