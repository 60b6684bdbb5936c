//! Error types for the trading engine.

use thiserror::Error;

/// Engine error types.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The order book is empty, one-sided, or crossed.
    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] grid_gateway::GatewayError),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
