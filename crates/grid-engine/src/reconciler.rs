//! Fill reconciliation state machine.
//!
//! Drives a single open-order attempt:
//! `PLACING -> WAITING_FILL -> {FILLED, PARTIAL_TIMEOUT, NOT_FILLED_TIMEOUT}
//! -> (CANCEL_IF_NEEDED) -> CLOSE_ISSUED -> DONE`.
//!
//! Post-only rejections loop back to `PLACING` against a fresh book up to
//! a bounded retry count. The account is never left with a filled quantity
//! the engine knows about and no covering close order; when a close
//! placement fails the next cycle's mismatch check is the backstop.

use crate::error::EngineResult;
use crate::monitor::OrderMonitor;
use crate::pricing::PricingPolicy;
use grid_core::{OrderResult, OrderSide, OrderStatus, Price, Size};
use grid_gateway::{ExchangeGateway, Placement};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Default bound on post-only placement retries.
pub const DEFAULT_MAX_PLACE_ATTEMPTS: u32 = 15;
/// Default bound on waiting for a fill notification.
pub const DEFAULT_FILL_WAIT: Duration = Duration::from_secs(10);
/// Default bound on waiting for a cancel confirmation.
pub const DEFAULT_CANCEL_WAIT: Duration = Duration::from_secs(5);

/// Engine parameters, fixed per run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub contract_id: String,
    /// Requested open-order quantity.
    pub quantity: Size,
    /// Trade direction of the strategy.
    pub direction: OrderSide,
    /// Take-profit offset in percent of the fill price.
    pub take_profit_pct: Decimal,
    pub max_place_attempts: u32,
    pub fill_wait: Duration,
    pub cancel_wait: Duration,
}

impl EngineConfig {
    pub fn new(
        contract_id: impl Into<String>,
        quantity: Size,
        direction: OrderSide,
        take_profit_pct: Decimal,
    ) -> Self {
        Self {
            contract_id: contract_id.into(),
            quantity,
            direction,
            take_profit_pct,
            max_place_attempts: DEFAULT_MAX_PLACE_ATTEMPTS,
            fill_wait: DEFAULT_FILL_WAIT,
            cancel_wait: DEFAULT_CANCEL_WAIT,
        }
    }

    /// Side of close orders: opposite of the trade direction.
    pub fn close_side(&self) -> OrderSide {
        self.direction.opposite()
    }
}

/// Terminal outcome of one open-order cycle. A value, not an error:
/// every branch leaves the account reconciled as far as the engine knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The full quantity filled and a close order was issued.
    Filled {
        fill_price: Price,
        close_order_placed: bool,
    },
    /// A partial fill was discovered at cancel time; the close order is
    /// sized to exactly the filled quantity.
    PartialFill {
        filled: Size,
        fill_price: Price,
        close_order_placed: bool,
    },
    /// Canceled with nothing filled; no close order.
    NotFilled,
    /// Placement retries exhausted without acceptance.
    MaxRetriesExceeded,
}

/// The fill reconciliation engine: one open order in flight at a time.
pub struct OpenOrderEngine<G: ExchangeGateway> {
    gateway: Arc<G>,
    monitor: Arc<OrderMonitor>,
    pricing: PricingPolicy,
    config: EngineConfig,
}

impl<G: ExchangeGateway> OpenOrderEngine<G> {
    pub fn new(
        gateway: Arc<G>,
        monitor: Arc<OrderMonitor>,
        pricing: PricingPolicy,
        config: EngineConfig,
    ) -> Self {
        Self {
            gateway,
            monitor,
            pricing,
            config,
        }
    }

    /// Place one open order and reconcile it to completion.
    ///
    /// Fails only on gateway transport errors or an invalid book; both are
    /// skip-this-cycle conditions for the caller.
    pub async fn run_open_cycle(&self) -> EngineResult<CycleOutcome> {
        for attempt in 1..=self.config.max_place_attempts {
            let bbo = self
                .gateway
                .fetch_best_bid_ask(&self.config.contract_id)
                .await?;
            let price = self.pricing.open_price(&bbo, self.config.direction)?;

            // Arm before placing: the fill event can beat the placement
            // response that carries the order id.
            self.monitor.arm();

            let placement = self
                .gateway
                .place_open_order(
                    &self.config.contract_id,
                    self.config.quantity,
                    self.config.direction,
                    price,
                )
                .await?;

            match placement {
                Placement::Accepted(result) => {
                    info!(
                        order_id = %result.order_id,
                        side = %result.side,
                        size = %result.size,
                        price = %result.price,
                        "Open order accepted"
                    );
                    return self.reconcile(result).await;
                }
                Placement::WouldCross => {
                    warn!(attempt, price = %price, "Post-only order would cross, re-pricing");
                }
                Placement::Rejected(reason) => {
                    warn!(attempt, reason = %reason, "Open order rejected, re-pricing");
                }
            }
        }

        warn!(
            attempts = self.config.max_place_attempts,
            "Open order rejected after max attempts"
        );
        Ok(CycleOutcome::MaxRetriesExceeded)
    }

    /// Wait for the accepted order to resolve and issue the close order.
    async fn reconcile(&self, result: OrderResult) -> EngineResult<CycleOutcome> {
        let order_id = result.order_id.clone();

        // Marketable post-only orders can come back already filled.
        let filled = result.status == OrderStatus::Filled
            || self.monitor.wait_filled(self.config.fill_wait).await;

        if filled {
            let fill_price = self.monitor.snapshot().filled_price.unwrap_or(result.price);
            let close_order_placed = self.place_close(self.config.quantity, fill_price).await;
            return Ok(CycleOutcome::Filled {
                fill_price,
                close_order_placed,
            });
        }

        info!(order_id = %order_id, "Not filled within wait, canceling");
        let filled_amount = self.resolve_canceled_fill(&order_id).await;

        if filled_amount.is_positive() {
            let fill_price = self.monitor.snapshot().filled_price.unwrap_or(result.price);
            let close_order_placed = self.place_close(filled_amount, fill_price).await;
            Ok(CycleOutcome::PartialFill {
                filled: filled_amount,
                fill_price,
                close_order_placed,
            })
        } else {
            Ok(CycleOutcome::NotFilled)
        }
    }

    /// Cancel the order and determine how much of it actually filled.
    ///
    /// Inference chain for the fill/cancel race: the cancel response's own
    /// filled size -> the push-channel cancel event -> an order-info query
    /// -> the live position snapshot, capped at the requested quantity.
    async fn resolve_canceled_fill(&self, order_id: &str) -> Size {
        match self.gateway.cancel_order(order_id).await {
            Ok(cancel_result) => {
                if let Some(filled) = cancel_result.filled_size {
                    return filled.min(self.config.quantity);
                }
                if self.monitor.wait_canceled(self.config.cancel_wait).await {
                    return self.monitor.snapshot().filled_size.min(self.config.quantity);
                }
                warn!(order_id, "No cancel confirmation within wait, querying order");
                self.infer_filled_size(order_id).await
            }
            Err(e) => {
                // Likely already filled or gone; never assume either way.
                warn!(order_id, error = %e, "Cancel failed, inferring filled size");
                self.infer_filled_size(order_id).await
            }
        }
    }

    async fn infer_filled_size(&self, order_id: &str) -> Size {
        match self.gateway.get_order_info(order_id).await {
            Ok(Some(info)) => info.filled_size.min(self.config.quantity),
            Ok(None) => {
                warn!(order_id, "Order unknown to venue, estimating fill from position");
                self.position_estimate().await
            }
            Err(e) => {
                warn!(order_id, error = %e, "Order query failed, estimating fill from position");
                self.position_estimate().await
            }
        }
    }

    /// Last-resort heuristic: read the live position as the fill estimate.
    async fn position_estimate(&self) -> Size {
        match self.gateway.get_account_positions().await {
            Ok(position) => {
                let estimate = position.abs().min(self.config.quantity);
                warn!(estimate = %estimate, "Using position snapshot as filled-size estimate");
                estimate
            }
            Err(e) => {
                error!(error = %e, "Position query failed, assuming nothing filled");
                Size::ZERO
            }
        }
    }

    /// Issue the take-profit close order for a filled quantity.
    ///
    /// Failures are logged, not propagated: an un-closed fill surfaces
    /// through the next cycle's position/close-order mismatch check.
    async fn place_close(&self, quantity: Size, fill_price: Price) -> bool {
        let close_side = self.config.close_side();
        let tp = self.config.take_profit_pct / Decimal::ONE_HUNDRED;
        let target = match close_side {
            OrderSide::Sell => fill_price * (Decimal::ONE + tp),
            OrderSide::Buy => fill_price * (Decimal::ONE - tp),
        };

        // Clamp against a fresh book so the close order rests; with no
        // usable book, fall back to the tick-rounded target.
        let price = match self
            .gateway
            .fetch_best_bid_ask(&self.config.contract_id)
            .await
        {
            Ok(bbo) if bbo.is_valid() => self
                .pricing
                .close_price(&bbo, target, close_side)
                .unwrap_or_else(|_| target.round_to_tick(self.pricing.tick_size())),
            _ => target.round_to_tick(self.pricing.tick_size()),
        };

        match self
            .gateway
            .place_close_order(&self.config.contract_id, quantity, price, close_side)
            .await
        {
            Ok(close_result) => {
                info!(
                    order_id = %close_result.order_id,
                    side = %close_side,
                    size = %quantity,
                    price = %price,
                    "Close order placed"
                );
                true
            }
            Err(e) => {
                error!(error = %e, size = %quantity, "Failed to place close order");
                false
            }
        }
    }
}
