//! Normalized execution types shared between the core and gateways.

use crate::{OrderKind, OrderSide, OrderStatus, Price, Size};
use serde::{Deserialize, Serialize};

/// Outcome of a successful placement or cancel attempt.
///
/// A gateway that returns one of these has an order id, side, size, price
/// and status for it; failures surface as `GatewayError` values instead of
/// half-populated results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderResult {
    /// Exchange-assigned order id.
    pub order_id: String,
    pub side: OrderSide,
    pub size: Size,
    pub price: Price,
    pub status: OrderStatus,
    /// Filled size, when the venue reports it (e.g. on cancel responses).
    pub filled_size: Option<Size>,
}

/// Queried snapshot of an order.
///
/// `filled_size + remaining_size == size` except during the brief window
/// between a partial fill event and the next poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_id: String,
    pub side: OrderSide,
    pub size: Size,
    pub price: Price,
    pub status: OrderStatus,
    pub filled_size: Size,
    pub remaining_size: Size,
}

/// Normalized order-lifecycle event delivered over the push channel.
///
/// `filled_size` is cumulative for the order, not an increment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: String,
    pub contract_id: String,
    pub side: OrderSide,
    pub kind: OrderKind,
    pub status: OrderStatus,
    pub size: Size,
    pub price: Price,
    pub filled_size: Size,
}
