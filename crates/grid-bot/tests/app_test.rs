//! Scheduling-loop cycles against the paper gateway.
//!
//! Time is paused; tokio auto-advances the engine's fill/cancel waits
//! and the loop's pacing sleeps.

use grid_bot::{AppError, BotConfig, TradingApp, TradingConfig};
use grid_core::{OrderInfo, OrderKind, OrderSide, OrderStatus, OrderUpdate, Price, Size};
use grid_gateway::PaperGateway;
use grid_risk::CooldownPolicy;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const CONTRACT: &str = "PAPER-PERP";

fn test_config(log_dir: &TempDir) -> BotConfig {
    BotConfig {
        trading: TradingConfig {
            ticker: "PAPER".to_string(),
            quantity: Size::new(dec!(1)),
            take_profit_pct: dec!(1),
            direction: OrderSide::Buy,
            max_orders: 18,
            exchange: "paper".to_string(),
            grid_step_pct: dec!(0.5),
            stop_price: None,
            pause_price: None,
            // Wide per-trade band so tests can exercise the global band.
            stop_loss_pct: dec!(50),
            take_profit_threshold_pct: dec!(50),
            global_stop_loss_pct: dec!(5),
            global_take_profit_pct: dec!(10),
            maker_aggressive: false,
            log_dir: log_dir.path().to_string_lossy().into_owned(),
        },
        cooldown: CooldownPolicy::default(),
    }
}

fn paper_gateway() -> Arc<PaperGateway> {
    let gateway = Arc::new(PaperGateway::with_defaults());
    gateway.set_bbo(Price::new(dec!(100.00)), Price::new(dec!(100.10)));
    gateway
}

fn filled_update(price: Price) -> OrderUpdate {
    OrderUpdate {
        order_id: "paper-1".to_string(),
        contract_id: CONTRACT.to_string(),
        side: OrderSide::Buy,
        kind: OrderKind::Open,
        status: OrderStatus::Filled,
        size: Size::new(dec!(1)),
        price,
        filled_size: Size::new(dec!(1)),
    }
}

fn resting_close(price: Price, size: Size) -> OrderInfo {
    OrderInfo {
        order_id: format!("close-{price}"),
        side: OrderSide::Sell,
        size,
        price,
        status: OrderStatus::Open,
        filled_size: Size::ZERO,
        remaining_size: size,
    }
}

/// Run one cycle with a scripted full fill at 100.00.
async fn run_fill_cycle(app: &mut TradingApp<PaperGateway>, gateway: &Arc<PaperGateway>) {
    let emitter = gateway.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        emitter.emit(filled_update(Price::new(dec!(100.00))));
    });
    app.cycle().await.unwrap();
}

#[tokio::test]
async fn initialize_rejects_quantity_below_venue_minimum() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.trading.quantity = Size::new(dec!(0.0001));

    let result = TradingApp::initialize(paper_gateway(), config).await;
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[tokio::test(start_paused = true)]
async fn fill_cycle_places_close_order_and_remembers_entry() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();
    assert!(gateway.is_connected());

    run_fill_cycle(&mut app, &gateway).await;

    assert_eq!(gateway.open_orders().len(), 1);
    let closes = gateway.close_orders();
    assert_eq!(closes.len(), 1);
    assert_eq!(closes[0].side, OrderSide::Sell);
    assert_eq!(closes[0].price, Price::new(dec!(101.00)));
    assert_eq!(app.last_fill_price(), Some(Price::new(dec!(100.00))));
}

#[tokio::test(start_paused = true)]
async fn global_stop_loss_closes_and_requests_shutdown() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();
    run_fill_cycle(&mut app, &gateway).await;

    // Mark drops 5% below the 100.00 entry.
    gateway.set_position(Size::new(dec!(1)));
    gateway.set_bbo(Price::new(dec!(94.95)), Price::new(dec!(95.05)));

    app.cycle().await.unwrap();

    assert!(app.shutdown_token().is_cancelled());
    assert_eq!(gateway.market_orders().len(), 1);
    assert_eq!(gateway.market_orders()[0].side, OrderSide::Sell);
    assert_eq!(app.last_fill_price(), None);
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent_even_if_price_reverts() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();
    run_fill_cycle(&mut app, &gateway).await;

    gateway.set_position(Size::new(dec!(1)));
    gateway.set_bbo(Price::new(dec!(94.95)), Price::new(dec!(95.05)));
    app.cycle().await.unwrap();
    assert!(app.shutdown_token().is_cancelled());
    let opens_after_kill = gateway.open_orders().len();

    // Price reverts; the kill decision must stand.
    gateway.set_bbo(Price::new(dec!(100.00)), Price::new(dec!(100.10)));
    gateway.set_position(Size::ZERO);
    app.cycle().await.unwrap();
    app.cycle().await.unwrap();

    assert_eq!(gateway.open_orders().len(), opens_after_kill);
}

#[tokio::test(start_paused = true)]
async fn mismatch_requests_shutdown_without_trading() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();

    // Five resting close rungs against a zero position: drift of 5 with
    // a threshold of 2 x quantity = 2.
    gateway.set_active_orders(vec![
        resting_close(Price::new(dec!(101)), Size::new(dec!(1))),
        resting_close(Price::new(dec!(102)), Size::new(dec!(1))),
        resting_close(Price::new(dec!(103)), Size::new(dec!(1))),
        resting_close(Price::new(dec!(104)), Size::new(dec!(1))),
        resting_close(Price::new(dec!(105)), Size::new(dec!(1))),
    ]);

    app.cycle().await.unwrap();

    assert!(app.shutdown_token().is_cancelled());
    assert!(gateway.open_orders().is_empty());
    assert!(gateway.market_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_price_halts_trading() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut config = test_config(&dir);
    // Buy direction watches the ask; the ask sits right at the level.
    config.trading.stop_price = Some(Price::new(dec!(100.10)));
    let mut app = TradingApp::initialize(gateway.clone(), config).await.unwrap();

    app.cycle().await.unwrap();

    assert!(app.shutdown_token().is_cancelled());
    assert!(gateway.open_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn pause_price_suspends_placement_without_shutdown() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut config = test_config(&dir);
    config.trading.pause_price = Some(Price::new(dec!(100.05)));
    let mut app = TradingApp::initialize(gateway.clone(), config).await.unwrap();

    app.cycle().await.unwrap();

    assert!(!app.shutdown_token().is_cancelled());
    assert!(gateway.open_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn per_trade_stop_loss_closes_without_shutdown() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut config = test_config(&dir);
    config.trading.stop_loss_pct = dec!(0.08);
    config.trading.take_profit_threshold_pct = dec!(0.12);
    let mut app = TradingApp::initialize(gateway.clone(), config).await.unwrap();
    run_fill_cycle(&mut app, &gateway).await;

    // Mark at 99.90: 0.1% below the 100.00 entry, inside the global band.
    gateway.set_position(Size::new(dec!(1)));
    gateway.set_bbo(Price::new(dec!(99.85)), Price::new(dec!(99.95)));

    app.cycle().await.unwrap();

    assert!(!app.shutdown_token().is_cancelled());
    assert_eq!(gateway.market_orders().len(), 1);
    assert_eq!(app.last_fill_price(), None);
}

#[tokio::test(start_paused = true)]
async fn leftover_position_is_cleared_before_trading() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();

    // Position with no remembered entry price: cleared at market, then
    // the cycle proceeds to place a fresh open order.
    gateway.set_position(Size::new(dec!(0.5)));

    app.cycle().await.unwrap();

    assert_eq!(gateway.market_orders().len(), 1);
    assert_eq!(gateway.market_orders()[0].quantity, Size::new(dec!(0.5)));
    assert_eq!(gateway.open_orders().len(), 1);
    // No fill event arrived, so the unfilled open order was canceled.
    assert_eq!(gateway.canceled_ids().len(), 1);
    assert!(gateway.close_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn global_kill_escalates_when_per_trade_close_fails() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut config = test_config(&dir);
    config.trading.stop_loss_pct = dec!(0.08);
    config.trading.take_profit_threshold_pct = dec!(0.12);
    let mut app = TradingApp::initialize(gateway.clone(), config).await.unwrap();
    run_fill_cycle(&mut app, &gateway).await;

    // Mark 6% below the 100.00 entry, past both bands, with the venue
    // rejecting every market close.
    gateway.set_position(Size::new(dec!(1)));
    gateway.set_bbo(Price::new(dec!(93.95)), Price::new(dec!(94.05)));
    gateway.fail_market_orders("venue rejected");

    app.cycle().await.unwrap();

    // The failing per-trade close must not mask the global stop-loss.
    assert!(app.shutdown_token().is_cancelled());
    assert!(gateway.market_orders().is_empty());
    assert_eq!(app.last_fill_price(), Some(Price::new(dec!(100.00))));
}

#[tokio::test(start_paused = true)]
async fn unfilled_attempt_retries_next_cycle_without_cooldown() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut app = TradingApp::initialize(gateway.clone(), test_config(&dir))
        .await
        .unwrap();

    // No fill events arrive: both cycles place, time out, and cancel.
    app.cycle().await.unwrap();
    app.cycle().await.unwrap();

    // A canceled zero-fill attempt does not start the cooldown clock.
    assert_eq!(gateway.open_orders().len(), 2);
    assert_eq!(gateway.canceled_ids().len(), 2);
    assert!(gateway.close_orders().is_empty());
}

#[tokio::test(start_paused = true)]
async fn run_disconnects_after_shutdown() {
    let dir = TempDir::new().unwrap();
    let gateway = paper_gateway();
    let mut config = test_config(&dir);
    config.trading.stop_price = Some(Price::new(dec!(100.10)));
    let mut app = TradingApp::initialize(gateway.clone(), config).await.unwrap();
    assert!(gateway.is_connected());

    app.run().await.unwrap();

    assert!(!gateway.is_connected());
    assert!(app.shutdown_token().is_cancelled());
}
