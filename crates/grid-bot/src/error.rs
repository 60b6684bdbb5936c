//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Gateway error: {0}")]
    Gateway(#[from] grid_gateway::GatewayError),

    #[error("Engine error: {0}")]
    Engine(#[from] grid_engine::EngineError),

    #[error("Risk error: {0}")]
    Risk(#[from] grid_risk::RiskError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] grid_telemetry::TelemetryError),
}

pub type AppResult<T> = Result<T, AppError>;
