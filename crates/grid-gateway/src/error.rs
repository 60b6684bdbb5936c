//! Error types for gateway operations.

use thiserror::Error;

/// Gateway error types.
///
/// `error_message` semantics from the unified contract: every failed call
/// carries a human-readable reason.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Ticker could not be resolved to a contract on the venue.
    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    /// Network or venue-side failure on a request/response call.
    #[error("Request failed: {0}")]
    Request(String),

    /// Order id not known to the venue.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Push-channel connection failure.
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Result type alias for gateway operations.
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
