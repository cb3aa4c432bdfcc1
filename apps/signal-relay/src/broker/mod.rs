//! Broker bridge integration.
//!
//! The bridge is a thin REST front over the trading terminal: a `/connect`
//! handshake, deal and modify endpoints, and read-only account/position
//! queries, authenticated with a static API key plus an account header.

pub mod api_types;
mod client;
mod error;

pub use api_types::{DealRequest, PositionData, TradeResult, order_type_code};
pub use client::BridgeClient;
pub use error::BrokerError;

use std::time::Duration;

/// Bridge connection configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge base URL.
    pub base_url: String,
    /// Static API key.
    pub api_key: String,
    /// Account number.
    pub account: String,
    /// Account password, used only for the handshake.
    pub password: String,
    /// Terminal server name.
    pub server: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryConfig,
}

impl BridgeConfig {
    /// Create a configuration with default timeout and retry policy.
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        account: impl Into<String>,
        password: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            account: account.into(),
            password: password.into(),
            server: server.into(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
        }
    }

    /// Set the HTTP timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry configuration.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts.
    pub max_attempts: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A policy that never retries. Used in tests.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::from_millis(0),
            max_backoff: Duration::from_millis(0),
            multiplier: 1.0,
        }
    }
}
