//! Core domain types for the maker-grid trading bot.
//!
//! This crate provides the fundamental types used throughout the system:
//! - `Price`, `Size`: precision-safe decimal newtypes
//! - `OrderSide`, `OrderKind`, `OrderStatus`: order lifecycle enums
//! - `Bbo`: best bid/offer snapshot
//! - `OrderResult`, `OrderInfo`, `OrderUpdate`: normalized execution types

pub mod decimal;
pub mod error;
pub mod execution;
pub mod order;
pub mod types;

pub use decimal::{Price, Size};
pub use error::{CoreError, Result};
pub use execution::{OrderInfo, OrderResult, OrderUpdate};
pub use order::{OrderKind, OrderSide, OrderStatus};
pub use types::Bbo;
