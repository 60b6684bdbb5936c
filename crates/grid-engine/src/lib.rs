//! Maker pricing and fill reconciliation.
//!
//! The heart of the trading system: [`OpenOrderEngine`] drives a single
//! open-order attempt from placement through fill/cancel reconciliation to
//! close-order issuance, waking on push-channel events relayed through
//! [`OrderMonitor`] and pricing every order via [`PricingPolicy`].

pub mod error;
pub mod monitor;
pub mod pricing;
pub mod reconciler;

pub use error::{EngineError, EngineResult};
pub use monitor::{FillSnapshot, OrderMonitor};
pub use pricing::PricingPolicy;
pub use reconciler::{CycleOutcome, EngineConfig, OpenOrderEngine};
