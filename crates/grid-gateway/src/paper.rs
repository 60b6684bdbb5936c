//! Deterministic in-memory gateway for tests and dry runs.
//!
//! `PaperGateway` never talks to a venue. Tests script it: queue placement
//! and cancel outcomes, set the book/position/active orders, and push
//! order-lifecycle events through [`PaperGateway::emit`] to exercise the
//! same callback path a live gateway would use.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{ContractAttributes, ExchangeGateway, OrderUpdateHandler, Placement};
use async_trait::async_trait;
use grid_core::{Bbo, OrderInfo, OrderResult, OrderSide, OrderStatus, OrderUpdate, Price, Size};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::{HashMap, VecDeque};

/// Record of a close-order placement, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseOrderRecord {
    pub contract_id: String,
    pub quantity: Size,
    pub price: Price,
    pub side: OrderSide,
}

/// Record of a market-order placement, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketOrderRecord {
    pub contract_id: String,
    pub quantity: Size,
    pub side: OrderSide,
}

#[derive(Default)]
struct PaperState {
    bbo: Option<Bbo>,
    position: Size,
    active_orders: Vec<OrderInfo>,
    order_infos: HashMap<String, OrderInfo>,
    queued_placements: VecDeque<Placement>,
    queued_cancels: VecDeque<Result<OrderResult, String>>,
    market_order_error: Option<String>,
    next_order_id: u64,
    connected: bool,
    open_orders: Vec<OrderResult>,
    close_orders: Vec<CloseOrderRecord>,
    market_orders: Vec<MarketOrderRecord>,
    canceled_ids: Vec<String>,
}

/// In-memory [`ExchangeGateway`] implementation.
pub struct PaperGateway {
    attributes: ContractAttributes,
    state: Mutex<PaperState>,
    handler: Mutex<Option<OrderUpdateHandler>>,
}

impl PaperGateway {
    /// Create a paper gateway with the given contract attributes.
    pub fn new(attributes: ContractAttributes) -> Self {
        Self {
            attributes,
            state: Mutex::new(PaperState::default()),
            handler: Mutex::new(None),
        }
    }

    /// Paper contract with a 0.01 tick and 0.001 minimum size.
    pub fn with_defaults() -> Self {
        Self::new(ContractAttributes {
            contract_id: "PAPER-PERP".to_string(),
            tick_size: Price::new(Decimal::new(1, 2)),
            min_order_size: Size::new(Decimal::new(1, 3)),
        })
    }

    pub fn set_bbo(&self, bid: Price, ask: Price) {
        self.state.lock().bbo = Some(Bbo::new(bid, ask));
    }

    pub fn set_position(&self, position: Size) {
        self.state.lock().position = position;
    }

    pub fn set_active_orders(&self, orders: Vec<OrderInfo>) {
        self.state.lock().active_orders = orders;
    }

    pub fn set_order_info(&self, info: OrderInfo) {
        self.state
            .lock()
            .order_infos
            .insert(info.order_id.clone(), info);
    }

    /// Queue the outcome of the next `place_open_order` call.
    /// When the queue is empty, placements are accepted as resting orders.
    pub fn queue_placement(&self, placement: Placement) {
        self.state.lock().queued_placements.push_back(placement);
    }

    /// Queue the outcome of the next `cancel_order` call.
    pub fn queue_cancel(&self, result: OrderResult) {
        self.state.lock().queued_cancels.push_back(Ok(result));
    }

    /// Queue a failure for the next `cancel_order` call.
    pub fn queue_cancel_error(&self, message: &str) {
        self.state
            .lock()
            .queued_cancels
            .push_back(Err(message.to_string()));
    }

    /// Make every `place_market_order` call fail until cleared.
    pub fn fail_market_orders(&self, message: &str) {
        self.state.lock().market_order_error = Some(message.to_string());
    }

    /// Deliver a push-channel event to the registered handler, as a live
    /// gateway's dispatch task would.
    pub fn emit(&self, update: OrderUpdate) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(update);
        }
    }

    pub fn open_orders(&self) -> Vec<OrderResult> {
        self.state.lock().open_orders.clone()
    }

    pub fn close_orders(&self) -> Vec<CloseOrderRecord> {
        self.state.lock().close_orders.clone()
    }

    pub fn market_orders(&self) -> Vec<MarketOrderRecord> {
        self.state.lock().market_orders.clone()
    }

    pub fn canceled_ids(&self) -> Vec<String> {
        self.state.lock().canceled_ids.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn next_id(state: &mut PaperState) -> String {
        state.next_order_id += 1;
        format!("paper-{}", state.next_order_id)
    }
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn get_contract_attributes(&self) -> GatewayResult<ContractAttributes> {
        Ok(self.attributes.clone())
    }

    async fn fetch_best_bid_ask(&self, _contract_id: &str) -> GatewayResult<Bbo> {
        // Zeroed book when unset, matching the transient-failure contract.
        Ok(self
            .state
            .lock()
            .bbo
            .unwrap_or_else(|| Bbo::new(Price::ZERO, Price::ZERO)))
    }

    async fn place_open_order(
        &self,
        _contract_id: &str,
        quantity: Size,
        side: OrderSide,
        price: Price,
    ) -> GatewayResult<Placement> {
        let mut state = self.state.lock();
        if let Some(queued) = state.queued_placements.pop_front() {
            if let Placement::Accepted(ref result) = queued {
                state.open_orders.push(result.clone());
            }
            return Ok(queued);
        }
        let order_id = Self::next_id(&mut state);
        let result = OrderResult {
            order_id,
            side,
            size: quantity,
            price,
            status: OrderStatus::Open,
            filled_size: None,
        };
        state.open_orders.push(result.clone());
        Ok(Placement::Accepted(result))
    }

    async fn place_close_order(
        &self,
        contract_id: &str,
        quantity: Size,
        price: Price,
        side: OrderSide,
    ) -> GatewayResult<OrderResult> {
        let mut state = self.state.lock();
        let order_id = Self::next_id(&mut state);
        state.close_orders.push(CloseOrderRecord {
            contract_id: contract_id.to_string(),
            quantity,
            price,
            side,
        });
        let info = OrderInfo {
            order_id: order_id.clone(),
            side,
            size: quantity,
            price,
            status: OrderStatus::Open,
            filled_size: Size::ZERO,
            remaining_size: quantity,
        };
        state.active_orders.push(info);
        Ok(OrderResult {
            order_id,
            side,
            size: quantity,
            price,
            status: OrderStatus::Open,
            filled_size: None,
        })
    }

    async fn place_market_order(
        &self,
        contract_id: &str,
        quantity: Size,
        side: OrderSide,
    ) -> GatewayResult<OrderResult> {
        let mut state = self.state.lock();
        if let Some(message) = state.market_order_error.clone() {
            return Err(GatewayError::Request(message));
        }
        state.market_orders.push(MarketOrderRecord {
            contract_id: contract_id.to_string(),
            quantity,
            side,
        });
        // Market orders fill instantly against the position.
        let remaining = state.position.inner() - quantity.inner();
        state.position = if remaining.is_sign_positive() {
            Size::new(remaining)
        } else {
            Size::ZERO
        };
        let order_id = Self::next_id(&mut state);
        let price = state
            .bbo
            .and_then(|b| b.mid_price())
            .unwrap_or(Price::ZERO);
        Ok(OrderResult {
            order_id,
            side,
            size: quantity,
            price,
            status: OrderStatus::Filled,
            filled_size: Some(quantity),
        })
    }

    async fn cancel_order(&self, order_id: &str) -> GatewayResult<OrderResult> {
        let mut state = self.state.lock();
        state.canceled_ids.push(order_id.to_string());
        if let Some(queued) = state.queued_cancels.pop_front() {
            return queued.map_err(GatewayError::Request);
        }
        state.active_orders.retain(|o| o.order_id != order_id);
        Ok(OrderResult {
            order_id: order_id.to_string(),
            side: OrderSide::Buy,
            size: Size::ZERO,
            price: Price::ZERO,
            status: OrderStatus::Canceled,
            filled_size: Some(Size::ZERO),
        })
    }

    async fn get_order_info(&self, order_id: &str) -> GatewayResult<Option<OrderInfo>> {
        Ok(self.state.lock().order_infos.get(order_id).cloned())
    }

    async fn get_active_orders(&self, _contract_id: &str) -> GatewayResult<Vec<OrderInfo>> {
        Ok(self.state.lock().active_orders.clone())
    }

    async fn get_account_positions(&self) -> GatewayResult<Size> {
        Ok(self.state.lock().position)
    }

    async fn connect(&self) -> GatewayResult<()> {
        self.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> GatewayResult<()> {
        self.state.lock().connected = false;
        Ok(())
    }

    fn register_order_update_handler(&self, handler: OrderUpdateHandler) {
        *self.handler.lock() = Some(handler);
    }
}
