//! Client configuration.

use std::time::Duration;

/// Configuration for a gateway session.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Gateway address, `ws://` or `wss://`.
    pub server_url: String,
    /// Shared API secret sent with every request, if the gateway
    /// requires one.
    pub api_secret: Option<String>,
    /// Deadline for a direct request/response exchange.
    pub request_timeout: Duration,
    /// Deadline for the deferred result event of a two-phase request.
    pub event_timeout: Duration,
    /// Interval between keepalive requests.
    pub keepalive_interval: Duration,
}

impl ClientConfig {
    /// Creates a configuration for the given gateway address with
    /// default timeouts.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            api_secret: None,
            request_timeout: Duration::from_secs(5),
            event_timeout: Duration::from_secs(15),
            keepalive_interval: Duration::from_secs(30),
        }
    }

    /// Builder: set the API secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Builder: set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Builder: set the deferred-event timeout.
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    /// Builder: set the keepalive interval.
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = interval;
        self
    }
}
