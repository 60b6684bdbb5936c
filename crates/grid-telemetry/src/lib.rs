//! Observability for the grid bot.
//!
//! - Structured logging with tracing (JSON in production)
//! - Append-only CSV transaction log, one file per contract
//! - Best-effort webhook notifications for kill-switch events

pub mod error;
pub mod logging;
pub mod notify;
pub mod transaction_log;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use notify::WebhookNotifier;
pub use transaction_log::TransactionLog;
