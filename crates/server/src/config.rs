//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use meetq_core::MeetqError;

/// Configuration for the meetq server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the API server to.
    pub api_addr: SocketAddr,
    /// Shared secret for the worker trigger and status stream.
    /// `None` leaves the endpoints unguarded.
    pub worker_token: Option<String>,
    /// How often the status stream re-reads the job record.
    pub stream_poll_interval: Duration,
    /// How long a stream stays open after a terminal status, for final
    /// delivery.
    pub stream_linger: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_addr: "127.0.0.1:8080".parse().expect("valid default address"),
            worker_token: None,
            stream_poll_interval: Duration::from_secs(3),
            stream_linger: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new builder with default values.
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for [`ServerConfig`].
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Set the bind address.
    pub fn api_addr(mut self, addr: SocketAddr) -> Self {
        self.config.api_addr = addr;
        self
    }

    /// Set the bind address from a string.
    pub fn api_addr_str(mut self, addr: &str) -> Result<Self, MeetqError> {
        self.config.api_addr = addr
            .parse()
            .map_err(|e| MeetqError::Config(format!("invalid api address '{}': {}", addr, e)))?;
        Ok(self)
    }

    /// Guard the worker trigger and status stream with a bearer token.
    pub fn worker_token(mut self, token: impl Into<String>) -> Self {
        self.config.worker_token = Some(token.into());
        self
    }

    /// Set the status stream poll interval.
    pub fn stream_poll_interval(mut self, interval: Duration) -> Self {
        self.config.stream_poll_interval = interval;
        self
    }

    /// Set the post-terminal linger for the status stream.
    pub fn stream_linger(mut self, linger: Duration) -> Self {
        self.config.stream_linger = linger;
        self
    }

    /// Build the config.
    pub fn build(self) -> ServerConfig {
        self.config
    }
}
