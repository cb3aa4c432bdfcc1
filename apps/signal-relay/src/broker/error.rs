//! Broker bridge error types.

use thiserror::Error;

/// Errors from the broker bridge client.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Transport-level failure (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Missing or rejected credentials.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Bridge returned an error payload.
    #[error("bridge error {code}: {message}")]
    Api {
        /// Error code reported by the bridge.
        code: String,
        /// Human-readable message.
        message: String,
    },

    /// The bridge acknowledged the request but refused the trade.
    #[error("trade rejected: {0}")]
    Rejected(String),

    /// No live position with the requested ticket.
    #[error("position {ticket} not found")]
    PositionNotFound {
        /// Ticket that was looked up.
        ticket: i64,
    },

    /// Response body could not be decoded.
    #[error("invalid response body: {0}")]
    JsonParse(String),

    /// Transient errors persisted past the retry budget.
    #[error("request failed after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Attempts made before giving up.
        attempts: u32,
    },
}
