//! Maker-grid trading bot.
//!
//! Wires the pricing/reconciliation engine, risk controller, and
//! telemetry around an [`ExchangeGateway`](grid_gateway::ExchangeGateway)
//! implementation and drives them from a single cooperative loop.

pub mod app;
pub mod config;
pub mod error;

pub use app::TradingApp;
pub use config::{BotConfig, CliOverrides, TradingConfig};
pub use error::{AppError, AppResult};
