//! Grid bot entry point.

use anyhow::Result;
use clap::Parser;
use grid_bot::{BotConfig, CliOverrides, TradingApp};
use grid_core::{OrderSide, Price, Size};
use grid_gateway::PaperGateway;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::info;

/// Maker-grid trading bot for perpetual futures
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via GRID_BOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Instrument ticker
    #[arg(long)]
    ticker: Option<String>,

    /// Open-order quantity
    #[arg(long)]
    quantity: Option<Decimal>,

    /// Take-profit offset in percent
    #[arg(long)]
    take_profit: Option<Decimal>,

    /// Trade direction (buy or sell)
    #[arg(long)]
    direction: Option<OrderSide>,

    /// Maximum outstanding close orders
    #[arg(long)]
    max_orders: Option<usize>,

    /// Base wait between open orders, in seconds
    #[arg(long)]
    wait_time: Option<u64>,

    /// Exchange gateway to use
    #[arg(long)]
    exchange: Option<String>,

    /// Grid step in percent
    #[arg(long)]
    grid_step: Option<Decimal>,

    /// Absolute stop price
    #[arg(long)]
    stop_price: Option<Decimal>,

    /// Absolute pause price
    #[arg(long)]
    pause_price: Option<Decimal>,

    /// Price open orders half a tick closer to the touch
    #[arg(long)]
    aggressive: Option<bool>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            ticker: self.ticker.clone(),
            quantity: self.quantity,
            take_profit: self.take_profit,
            direction: self.direction,
            max_orders: self.max_orders,
            wait_time: self.wait_time,
            exchange: self.exchange.clone(),
            grid_step: self.grid_step,
            stop_price: self.stop_price,
            pause_price: self.pause_price,
            aggressive: self.aggressive,
        }
    }
}

fn build_gateway(config: &BotConfig) -> Result<Arc<PaperGateway>> {
    match config.trading.exchange.as_str() {
        "paper" => {
            let gateway = Arc::new(PaperGateway::new(grid_gateway::ContractAttributes {
                contract_id: format!("{}-PERP", config.trading.ticker.to_uppercase()),
                tick_size: Price::new(dec!(0.01)),
                min_order_size: Size::new(dec!(0.001)),
            }));
            // Static book so dry runs exercise the full cycle.
            gateway.set_bbo(Price::new(dec!(100.00)), Price::new(dec!(100.10)));
            Ok(gateway)
        }
        other => anyhow::bail!(
            "unsupported exchange: {other} (only the paper gateway ships in-tree)"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    grid_telemetry::init_logging()?;
    info!("Starting grid-bot v{}", env!("CARGO_PKG_VERSION"));

    let config_path = args
        .config
        .clone()
        .or_else(|| std::env::var("GRID_BOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());
    info!(config_path = %config_path, "Loading configuration");

    let mut config = BotConfig::from_file(&config_path)?;
    config.apply_overrides(&args.overrides());
    config.validate()?;

    let gateway = build_gateway(&config)?;
    let mut app = TradingApp::initialize(gateway, config).await?;

    let shutdown = app.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, requesting shutdown");
            shutdown.cancel();
        }
    });

    app.run().await?;
    Ok(())
}
