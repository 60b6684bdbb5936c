//! The scheduling loop.
//!
//! One iteration per cycle: poll the position, run the kill switches and
//! position clearing, rebuild the close-order projection, check mismatch
//! and stop/pause levels, then gate a new open order on cooldown and
//! grid spacing. A single open order is in flight at any time; the
//! gateway connection is released exactly once on exit regardless of how
//! the loop ends.

use crate::config::BotConfig;
use crate::error::{AppError, AppResult};
use grid_core::{OrderInfo, OrderStatus, Price, Size};
use grid_engine::{CycleOutcome, EngineConfig, OpenOrderEngine, OrderMonitor, PricingPolicy};
use grid_gateway::{ContractAttributes, ExchangeGateway, GatewayError};
use grid_risk::{CooldownGate, CooldownTracker, PriceAction, SlTpTrigger};
use grid_telemetry::{TransactionLog, WebhookNotifier};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pacing between loop iterations.
const CYCLE_INTERVAL: Duration = Duration::from_secs(1);
/// Re-check pacing while gated (cooldown, grid step, full grid).
const IDLE_WAIT: Duration = Duration::from_secs(1);
/// Placement suspension while the pause level is breached.
const PAUSE_WAIT: Duration = Duration::from_secs(5);
/// Grace period for the venue to reflect a market close.
const SETTLE_WAIT: Duration = Duration::from_secs(1);

/// The trading application: configuration, gateway session, and the
/// per-cycle state (cooldown tracker, remembered entry price).
pub struct TradingApp<G: ExchangeGateway> {
    gateway: Arc<G>,
    config: BotConfig,
    contract: ContractAttributes,
    engine: OpenOrderEngine<G>,
    tracker: CooldownTracker,
    /// Entry-price memory for the kill switches; cleared whenever a
    /// market close is issued.
    last_fill_price: Option<Price>,
    shutdown: CancellationToken,
    notifier: Option<WebhookNotifier>,
}

impl<G: ExchangeGateway> TradingApp<G> {
    /// Resolve contract metadata, wire up the push channel, and connect.
    ///
    /// Fails fast when the configured quantity is below the venue
    /// minimum.
    pub async fn initialize(gateway: Arc<G>, config: BotConfig) -> AppResult<Self> {
        config.validate()?;

        let contract = gateway.get_contract_attributes().await?;
        if config.trading.quantity < contract.min_order_size {
            return Err(AppError::Config(format!(
                "quantity {} below venue minimum {}",
                config.trading.quantity, contract.min_order_size
            )));
        }

        let trading = &config.trading;
        info!("=== Trading Configuration ===");
        info!(
            ticker = %trading.ticker,
            contract_id = %contract.contract_id,
            tick_size = %contract.tick_size,
            quantity = %trading.quantity,
            take_profit_pct = %trading.take_profit_pct,
            direction = %trading.direction,
            "Instrument"
        );
        info!(
            max_orders = trading.max_orders,
            base_wait_secs = config.cooldown.base_wait_secs,
            exchange = %trading.exchange,
            grid_step_pct = %trading.grid_step_pct,
            stop_price = ?trading.stop_price,
            pause_price = ?trading.pause_price,
            maker_aggressive = trading.maker_aggressive,
            "Strategy"
        );

        let monitor = Arc::new(OrderMonitor::new(&contract.contract_id));
        let tx_log = Arc::new(TransactionLog::new(&contract.contract_id, &trading.log_dir));

        let handler_monitor = monitor.clone();
        let handler_log = tx_log.clone();
        gateway.register_order_update_handler(Arc::new(move |update| {
            handler_monitor.on_update(&update);
            let executed = update.status == OrderStatus::Filled
                || (update.status == OrderStatus::Canceled && update.filled_size.is_positive());
            if executed {
                if let Err(e) = handler_log.record(
                    &update.order_id,
                    update.side,
                    update.filled_size,
                    update.price,
                    &update.status.to_string(),
                ) {
                    warn!(error = %e, "Failed to record transaction");
                }
            }
        }));

        let pricing = PricingPolicy::new(contract.tick_size, trading.maker_aggressive);
        let engine_config = EngineConfig::new(
            &contract.contract_id,
            trading.quantity,
            trading.direction,
            trading.take_profit_pct,
        );
        let engine = OpenOrderEngine::new(gateway.clone(), monitor, pricing, engine_config);

        gateway.connect().await?;
        info!("Gateway connected");

        Ok(Self {
            gateway,
            config,
            contract,
            engine,
            tracker: CooldownTracker::new(),
            last_fill_price: None,
            shutdown: CancellationToken::new(),
            notifier: WebhookNotifier::from_env(),
        })
    }

    /// Token that requests a cooperative shutdown when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn last_fill_price(&self) -> Option<Price> {
        self.last_fill_price
    }

    /// Run the trading loop until shutdown, then disconnect the gateway.
    pub async fn run(&mut self) -> AppResult<()> {
        let result = self.trading_loop().await;
        if let Err(e) = &result {
            error!(error = %e, "Trading loop terminated with error");
        }
        // Single guaranteed release of the gateway session.
        match self.gateway.disconnect().await {
            Ok(()) => info!("Gateway disconnected"),
            Err(e) => error!(error = %e, "Error disconnecting gateway"),
        }
        result
    }

    async fn trading_loop(&mut self) -> AppResult<()> {
        info!("Starting trading loop");
        while !self.shutdown.is_cancelled() {
            self.cycle().await?;

            let shutdown = self.shutdown.clone();
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(CYCLE_INTERVAL) => {}
            }
        }
        info!("Shutdown requested, exiting trading loop");
        Ok(())
    }

    /// One scheduling iteration.
    ///
    /// Gateway transport failures skip the cycle rather than abort the
    /// loop; kill switches and mismatches cancel the shutdown token.
    pub async fn cycle(&mut self) -> AppResult<()> {
        if self.shutdown.is_cancelled() {
            return Ok(());
        }

        let mut position = match self.gateway.get_account_positions().await {
            Ok(p) => p.abs(),
            Err(e) => {
                warn!(error = %e, "Position query failed, skipping cycle");
                return Ok(());
            }
        };

        if position.is_positive() {
            position = self.check_kill_switches(position).await;
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
            if position.is_positive() {
                position = self.clear_position(position).await;
            }
        }

        let close_orders = match self.close_projection().await {
            Ok(orders) => orders,
            Err(e) => {
                warn!(error = %e, "Active-orders query failed, skipping cycle");
                return Ok(());
            }
        };

        if grid_risk::mismatch_exceeded(position, &close_orders, self.config.trading.quantity) {
            let closing = grid_risk::total_close_size(&close_orders);
            error!("Position mismatch detected");
            error!("###### ERROR ###### ERROR ###### ERROR ######");
            error!(
                position = %position,
                closing = %closing,
                "Manually rebalance the position and its take-profit orders"
            );
            error!("###### ERROR ###### ERROR ###### ERROR ######");
            self.shutdown.cancel();
            return Ok(());
        }

        match self.price_action().await {
            PriceAction::Stop => {
                let msg = format!(
                    "[{}_{}] Stopped trading: stop price reached",
                    self.config.trading.exchange.to_uppercase(),
                    self.config.trading.ticker.to_uppercase()
                );
                warn!("{msg}");
                self.notify(&msg).await;
                self.shutdown.cancel();
                return Ok(());
            }
            PriceAction::Pause => {
                debug!("Pause price reached, placement suspended");
                sleep(PAUSE_WAIT).await;
                return Ok(());
            }
            PriceAction::Trade => {}
        }

        match self.tracker.gate(
            &self.config.cooldown,
            close_orders.len(),
            self.config.trading.max_orders,
        ) {
            CooldownGate::Blocked => {
                debug!(rungs = close_orders.len(), "Grid full, placement blocked");
                sleep(IDLE_WAIT).await;
                return Ok(());
            }
            CooldownGate::Cooling(remaining) => {
                sleep(IDLE_WAIT.min(remaining)).await;
                return Ok(());
            }
            CooldownGate::Ready => {}
        }

        let bbo = match self
            .gateway
            .fetch_best_bid_ask(&self.contract.contract_id)
            .await
        {
            Ok(bbo) => bbo,
            Err(e) => {
                warn!(error = %e, "Book fetch failed, skipping cycle");
                return Ok(());
            }
        };
        match grid_risk::grid_gate(
            &close_orders,
            &bbo,
            self.config.trading.direction,
            self.config.trading.take_profit_pct,
            self.config.trading.grid_step_pct,
        ) {
            Ok(true) => {}
            Ok(false) => {
                debug!("Grid step condition not met");
                sleep(IDLE_WAIT).await;
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, "Grid gate skipped, no usable book");
                sleep(IDLE_WAIT).await;
                return Ok(());
            }
        }

        match self.engine.run_open_cycle().await {
            Ok(outcome) => match outcome {
                CycleOutcome::Filled { fill_price, .. }
                | CycleOutcome::PartialFill { fill_price, .. } => {
                    self.last_fill_price = Some(fill_price);
                    self.tracker.record_open();
                }
                CycleOutcome::NotFilled => {
                    // Nothing opened, so the cooldown clock does not
                    // restart; the next cycle may retry immediately.
                    debug!("Open order unfilled and canceled");
                }
                CycleOutcome::MaxRetriesExceeded => {
                    warn!("Open order retries exhausted this cycle");
                }
            },
            Err(e) => {
                warn!(error = %e, "Open-order cycle failed, skipping");
            }
        }
        Ok(())
    }

    /// Per-trade, then global SL/TP against the book midpoint.
    ///
    /// Returns the (possibly re-polled) position. A global trigger
    /// closes at market, pushes a notification, and requests shutdown.
    async fn check_kill_switches(&mut self, mut position: Size) -> Size {
        let Some(entry) = self.last_fill_price else {
            return position;
        };
        let bbo = match self
            .gateway
            .fetch_best_bid_ask(&self.contract.contract_id)
            .await
        {
            Ok(bbo) => bbo,
            Err(e) => {
                warn!(error = %e, "Book fetch failed, kill switches skipped");
                return position;
            }
        };
        if !bbo.is_valid() {
            return position;
        }
        let mark = Price::midpoint(bbo.bid, bbo.ask);
        let direction = self.config.trading.direction;
        let Some(frac) = grid_risk::position_profit_frac(entry, mark, direction) else {
            return position;
        };

        if let Some(trigger) =
            grid_risk::evaluate_sl_tp(frac, self.config.trading.per_trade_thresholds())
        {
            match trigger {
                SlTpTrigger::StopLoss => {
                    warn!(profit_frac = %frac, "Per-trade stop-loss hit, closing at market")
                }
                SlTpTrigger::TakeProfit => {
                    info!(profit_frac = %frac, "Per-trade take-profit hit, closing at market")
                }
            }
            if self.market_close(position).await {
                self.last_fill_price = None;
                position = self.settle_and_poll(position).await;
            }
            if !position.is_positive() {
                return position;
            }
            // Close failed or the position survived it: fall through to
            // the global band in this same iteration.
        }

        if let Some(trigger) =
            grid_risk::evaluate_sl_tp(frac, self.config.trading.global_thresholds())
        {
            let msg = match trigger {
                SlTpTrigger::StopLoss => format!(
                    "GLOBAL STOP-LOSS TRIGGERED: profit {frac}. \
                     Closing position {position} at market and shutting down."
                ),
                SlTpTrigger::TakeProfit => format!(
                    "GLOBAL TAKE-PROFIT TRIGGERED: profit {frac}. \
                     Closing position {position} at market and shutting down."
                ),
            };
            error!("{msg}");
            if self.market_close(position).await {
                self.last_fill_price = None;
                position = self.settle_and_poll(position).await;
            }
            self.notify(&msg).await;
            self.shutdown.cancel();
        }
        position
    }

    /// Market-close a leftover position before opening anything new.
    async fn clear_position(&mut self, position: Size) -> Size {
        info!(position = %position, "Found existing position, closing with market order");
        if !self.market_close(position).await {
            return position;
        }
        self.last_fill_price = None;
        let remaining = self.settle_and_poll(position).await;
        if remaining.is_positive() {
            warn!(position = %remaining, "Position still present after clearing attempt");
        }
        remaining
    }

    async fn market_close(&self, position: Size) -> bool {
        match self
            .gateway
            .place_market_order(
                &self.contract.contract_id,
                position,
                self.config.trading.close_order_side(),
            )
            .await
        {
            Ok(result) => {
                info!(order_id = %result.order_id, size = %position, "Closed position at market");
                true
            }
            Err(e) => {
                error!(error = %e, size = %position, "Failed to close position at market");
                false
            }
        }
    }

    async fn settle_and_poll(&self, fallback: Size) -> Size {
        sleep(SETTLE_WAIT).await;
        match self.gateway.get_account_positions().await {
            Ok(p) => p.abs(),
            Err(e) => {
                warn!(error = %e, "Position re-poll failed");
                fallback
            }
        }
    }

    async fn close_projection(&self) -> Result<Vec<OrderInfo>, GatewayError> {
        let orders = self
            .gateway
            .get_active_orders(&self.contract.contract_id)
            .await?;
        let side = self.config.trading.close_order_side();
        Ok(orders.into_iter().filter(|o| o.side == side).collect())
    }

    async fn price_action(&self) -> PriceAction {
        let trading = &self.config.trading;
        if trading.stop_price.is_none() && trading.pause_price.is_none() {
            return PriceAction::Trade;
        }
        let bbo = match self
            .gateway
            .fetch_best_bid_ask(&self.contract.contract_id)
            .await
        {
            Ok(bbo) => bbo,
            Err(e) => {
                warn!(error = %e, "Book fetch failed, price triggers skipped");
                return PriceAction::Trade;
            }
        };
        match grid_risk::price_trigger(&bbo, trading.direction, trading.stop_price, trading.pause_price)
        {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "Price triggers skipped, no usable book");
                PriceAction::Trade
            }
        }
    }

    async fn notify(&self, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.send_text(message).await;
        }
    }
}
