//! The `ExchangeGateway` trait.

use crate::error::GatewayResult;
use async_trait::async_trait;
use grid_core::{Bbo, OrderInfo, OrderResult, OrderSide, OrderUpdate, Price, Size};
use std::sync::Arc;

/// Callback invoked by the gateway's push channel on order-lifecycle events.
///
/// Runs on the gateway's dispatch task. Implementations must marshal any
/// wake-up back to the trading loop through a thread-safe signal rather
/// than blocking here.
pub type OrderUpdateHandler = Arc<dyn Fn(OrderUpdate) + Send + Sync>;

/// Contract metadata resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractAttributes {
    /// Venue contract identifier for the configured ticker.
    pub contract_id: String,
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum order size accepted by the venue.
    pub min_order_size: Size,
}

/// Tagged outcome of a post-only placement attempt.
///
/// Post-only rejections are ordinary values here, not errors: the caller's
/// retry loop re-prices against a fresh book and tries again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Order accepted by the venue.
    Accepted(OrderResult),
    /// Post-only order would have crossed the spread and was rejected.
    WouldCross,
    /// Venue rejected the order for another reason.
    Rejected(String),
}

/// Abstract exchange capability consumed uniformly by the trading core.
///
/// One logical session per venue: `connect` is called once at startup and
/// `disconnect` exactly once at shutdown, regardless of exit path.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Resolve the configured ticker to contract metadata.
    ///
    /// Fails if the ticker is unknown on the venue.
    async fn get_contract_attributes(&self) -> GatewayResult<ContractAttributes>;

    /// Fetch the best bid/ask for a contract.
    ///
    /// Returns a zeroed [`Bbo`] on transient failure; callers treat an
    /// invalid book as "no data" and skip the cycle rather than crash.
    async fn fetch_best_bid_ask(&self, contract_id: &str) -> GatewayResult<Bbo>;

    /// Place a post-only open order at the given maker price.
    async fn place_open_order(
        &self,
        contract_id: &str,
        quantity: Size,
        side: OrderSide,
        price: Price,
    ) -> GatewayResult<Placement>;

    /// Place a resting close (take-profit) order.
    async fn place_close_order(
        &self,
        contract_id: &str,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> GatewayResult<OrderResult>;

    /// Place a market order. Best-effort: venues without a native market
    /// type emulate it with an aggressively priced limit order.
    async fn place_market_order(
        &self,
        contract_id: &str,
        quantity: Size,
        side: OrderSide,
    ) -> GatewayResult<OrderResult>;

    /// Cancel an order.
    ///
    /// Must report `filled_size` even on a "not found" style response,
    /// using best-effort inference, so the caller can size its close order.
    async fn cancel_order(&self, order_id: &str) -> GatewayResult<OrderResult>;

    /// Query a single order. `None` when the venue no longer knows the id.
    async fn get_order_info(&self, order_id: &str) -> GatewayResult<Option<OrderInfo>>;

    /// Query all resting orders for a contract.
    async fn get_active_orders(&self, contract_id: &str) -> GatewayResult<Vec<OrderInfo>>;

    /// Current position magnitude for the traded contract.
    async fn get_account_positions(&self) -> GatewayResult<Size>;

    /// Establish the push-notification channel. Idempotent.
    async fn connect(&self) -> GatewayResult<()>;

    /// Tear down the push-notification channel. Idempotent.
    async fn disconnect(&self) -> GatewayResult<()>;

    /// Register the order-update callback for the push channel.
    fn register_order_update_handler(&self, handler: OrderUpdateHandler);
}
