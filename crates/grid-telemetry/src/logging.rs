//! Structured logging initialization.
//!
//! Development runs get a compact single-line format without targets;
//! production runs (`RUST_ENV=production`) switch to flattened JSON
//! lines for log ingestion. The filter comes from `RUST_LOG`, defaulting
//! to info globally with debug for the grid crates.

use crate::error::TelemetryResult;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,grid=debug";

pub fn init_logging() -> TelemetryResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(env_filter);

    let production = std::env::var("RUST_ENV").is_ok_and(|v| v == "production");
    if production {
        registry
            .with(fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry
            .with(fmt::layer().compact().with_target(false))
            .init();
    }

    Ok(())
}
