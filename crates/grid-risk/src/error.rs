//! Error types for the risk controller.

use thiserror::Error;

/// Risk evaluation error types.
#[derive(Debug, Error)]
pub enum RiskError {
    /// The order book is empty, one-sided, or crossed.
    #[error("Invalid market data: {0}")]
    InvalidMarketData(String),
}

/// Result type alias for risk evaluations.
pub type RiskResult<T> = std::result::Result<T, RiskError>;
