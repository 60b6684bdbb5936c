//! Exchange gateway capability contract.
//!
//! The trading core depends only on the [`ExchangeGateway`] trait; one
//! conforming implementation exists per venue. Venue-specific concerns
//! (authentication, request signing, rate limits, wire formats) live
//! entirely behind this boundary.
//!
//! The in-tree [`PaperGateway`] is a deterministic in-memory
//! implementation used by tests and dry runs.

pub mod error;
pub mod gateway;
pub mod paper;

pub use error::{GatewayError, GatewayResult};
pub use gateway::{ContractAttributes, ExchangeGateway, OrderUpdateHandler, Placement};
pub use paper::PaperGateway;
