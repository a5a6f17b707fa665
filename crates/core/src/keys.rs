//! Store key management with namespace support.

/// Manages store keys with a namespace prefix.
#[derive(Debug, Clone)]
pub struct Keys {
    namespace: String,
}

impl Keys {
    /// Create a new Keys instance with the given namespace.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Get the namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Key for the pending tasks queue (LIST).
    /// Tasks waiting for a worker pass are stored here, FIFO.
    pub fn tasks(&self) -> String {
        format!("{}:tasks", self.namespace)
    }

    /// Key for the dead letter queue (LIST).
    /// Tasks that exhausted their retry budget are stored here.
    pub fn dead(&self) -> String {
        format!("{}:dead", self.namespace)
    }

    /// Key for a circuit breaker's stored status record.
    pub fn breaker_state(&self, service: &str) -> String {
        format!("{}:breaker:{}", self.namespace, service)
    }

    /// Key for a circuit breaker's failure counter (atomic INCR target).
    pub fn breaker_failures(&self, service: &str) -> String {
        format!("{}:breaker:{}:failures", self.namespace, service)
    }

    /// Key for a cache entry under an application key.
    pub fn cache(&self, key: &str) -> String {
        format!("{}:cache:{}", self.namespace, key)
    }

    /// Pattern matching every cache entry derived for one owner.
    pub fn cache_user_pattern(&self, owner_id: &str) -> String {
        format!("{}:cache:user:{}:*", self.namespace, owner_id)
    }
}
