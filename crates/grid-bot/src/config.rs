//! Application configuration.
//!
//! Loaded from a TOML file with per-field defaults, then overlaid with
//! command-line overrides. Venue credentials are never part of this
//! file; they belong to gateway implementations and stay in the
//! environment.

use crate::error::{AppError, AppResult};
use grid_core::{OrderSide, Price, Size};
use grid_risk::{CooldownPolicy, SlTpThresholds};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_quantity() -> Size {
    Size::new(Decimal::new(1, 1))
}

fn default_take_profit_pct() -> Decimal {
    Decimal::new(9, 1)
}

fn default_direction() -> OrderSide {
    OrderSide::Buy
}

fn default_max_orders() -> usize {
    40
}

fn default_exchange() -> String {
    "paper".to_string()
}

fn default_grid_step_pct() -> Decimal {
    Decimal::new(5, 1)
}

fn default_stop_loss_pct() -> Decimal {
    Decimal::new(8, 2)
}

fn default_take_profit_threshold_pct() -> Decimal {
    Decimal::new(12, 2)
}

fn default_global_stop_loss_pct() -> Decimal {
    Decimal::from(5)
}

fn default_global_take_profit_pct() -> Decimal {
    Decimal::from(10)
}

fn default_maker_aggressive() -> bool {
    true
}

fn default_log_dir() -> String {
    ".".to_string()
}

/// Trading strategy parameters, immutable for the lifetime of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Instrument ticker, resolved to a contract id at startup.
    pub ticker: String,
    /// Open-order quantity per cycle.
    #[serde(default = "default_quantity")]
    pub quantity: Size,
    /// Take-profit offset of close orders, percent of the fill price.
    #[serde(default = "default_take_profit_pct")]
    pub take_profit_pct: Decimal,
    #[serde(default = "default_direction")]
    pub direction: OrderSide,
    /// Maximum outstanding close orders (grid rungs).
    #[serde(default = "default_max_orders")]
    pub max_orders: usize,
    #[serde(default = "default_exchange")]
    pub exchange: String,
    /// Minimum spacing between grid rungs, percent.
    #[serde(default = "default_grid_step_pct")]
    pub grid_step_pct: Decimal,
    /// Absolute price level that shuts the bot down.
    #[serde(default)]
    pub stop_price: Option<Price>,
    /// Absolute price level that suspends placement.
    #[serde(default)]
    pub pause_price: Option<Price>,
    /// Per-trade stop-loss threshold, percent.
    #[serde(default = "default_stop_loss_pct")]
    pub stop_loss_pct: Decimal,
    /// Per-trade take-profit threshold, percent.
    #[serde(default = "default_take_profit_threshold_pct")]
    pub take_profit_threshold_pct: Decimal,
    /// Portfolio-wide stop-loss, percent.
    #[serde(default = "default_global_stop_loss_pct")]
    pub global_stop_loss_pct: Decimal,
    /// Portfolio-wide take-profit, percent.
    #[serde(default = "default_global_take_profit_pct")]
    pub global_take_profit_pct: Decimal,
    /// Price open orders half a tick closer to the touch.
    #[serde(default = "default_maker_aggressive")]
    pub maker_aggressive: bool,
    /// Directory for the CSV transaction log.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl TradingConfig {
    /// Side of close orders: opposite of the trade direction.
    pub fn close_order_side(&self) -> OrderSide {
        self.direction.opposite()
    }

    pub fn per_trade_thresholds(&self) -> SlTpThresholds {
        SlTpThresholds {
            stop_loss_pct: self.stop_loss_pct,
            take_profit_pct: self.take_profit_threshold_pct,
        }
    }

    pub fn global_thresholds(&self) -> SlTpThresholds {
        SlTpThresholds {
            stop_loss_pct: self.global_stop_loss_pct,
            take_profit_pct: self.global_take_profit_pct,
        }
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    pub trading: TradingConfig,
    #[serde(default)]
    pub cooldown: CooldownPolicy,
}

/// Command-line overrides, applied on top of the file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub ticker: Option<String>,
    pub quantity: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    pub direction: Option<OrderSide>,
    pub max_orders: Option<usize>,
    pub wait_time: Option<u64>,
    pub exchange: Option<String>,
    pub grid_step: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub pause_price: Option<Decimal>,
    pub aggressive: Option<bool>,
}

impl BotConfig {
    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read {}: {e}", path.display())))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        let trading = &mut self.trading;
        if let Some(ticker) = &overrides.ticker {
            trading.ticker = ticker.clone();
        }
        if let Some(quantity) = overrides.quantity {
            trading.quantity = Size::new(quantity);
        }
        if let Some(take_profit) = overrides.take_profit {
            trading.take_profit_pct = take_profit;
        }
        if let Some(direction) = overrides.direction {
            trading.direction = direction;
        }
        if let Some(max_orders) = overrides.max_orders {
            trading.max_orders = max_orders;
        }
        if let Some(wait_time) = overrides.wait_time {
            self.cooldown.base_wait_secs = wait_time;
        }
        if let Some(exchange) = &overrides.exchange {
            trading.exchange = exchange.clone();
        }
        if let Some(grid_step) = overrides.grid_step {
            trading.grid_step_pct = grid_step;
        }
        if let Some(stop_price) = overrides.stop_price {
            trading.stop_price = Some(Price::new(stop_price));
        }
        if let Some(pause_price) = overrides.pause_price {
            trading.pause_price = Some(Price::new(pause_price));
        }
        if let Some(aggressive) = overrides.aggressive {
            trading.maker_aggressive = aggressive;
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        let trading = &self.trading;
        if trading.ticker.is_empty() {
            return Err(AppError::Config("ticker must not be empty".to_string()));
        }
        if !trading.quantity.is_positive() {
            return Err(AppError::Config(format!(
                "quantity must be positive, got {}",
                trading.quantity
            )));
        }
        if trading.take_profit_pct <= Decimal::ZERO {
            return Err(AppError::Config(format!(
                "take_profit_pct must be positive, got {}",
                trading.take_profit_pct
            )));
        }
        if trading.grid_step_pct < Decimal::ZERO {
            return Err(AppError::Config(format!(
                "grid_step_pct must not be negative, got {}",
                trading.grid_step_pct
            )));
        }
        if trading.max_orders == 0 {
            return Err(AppError::Config(
                "max_orders must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn parse(content: &str) -> BotConfig {
        toml::from_str(content).unwrap()
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = parse("[trading]\nticker = \"ETH\"\n");
        assert_eq!(config.trading.ticker, "ETH");
        assert_eq!(config.trading.quantity, Size::new(dec!(0.1)));
        assert_eq!(config.trading.take_profit_pct, dec!(0.9));
        assert_eq!(config.trading.direction, OrderSide::Buy);
        assert_eq!(config.trading.max_orders, 40);
        assert_eq!(config.trading.grid_step_pct, dec!(0.5));
        assert_eq!(config.trading.stop_price, None);
        assert!(config.trading.maker_aggressive);
        assert_eq!(config.cooldown.base_wait_secs, 450);
        assert_eq!(config.trading.close_order_side(), OrderSide::Sell);
    }

    #[test]
    fn test_full_config_round_trip() {
        let config = parse(
            r#"
            [trading]
            ticker = "BTC"
            quantity = 0.5
            take_profit_pct = 1.2
            direction = "sell"
            max_orders = 18
            grid_step_pct = 0.8
            stop_price = 40000
            pause_price = 45000
            maker_aggressive = false

            [cooldown]
            base_wait_secs = 300
            floor_secs = 30
            "#,
        );
        assert_eq!(config.trading.direction, OrderSide::Sell);
        assert_eq!(config.trading.close_order_side(), OrderSide::Buy);
        assert_eq!(config.trading.stop_price, Some(Price::new(dec!(40000))));
        assert_eq!(config.cooldown.base_wait_secs, 300);
        assert_eq!(config.cooldown.floor_secs, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = parse("[trading]\nticker = \"ETH\"\n");
        let overrides = CliOverrides {
            ticker: Some("SOL".to_string()),
            quantity: Some(dec!(2)),
            direction: Some(OrderSide::Sell),
            wait_time: Some(120),
            stop_price: Some(dec!(10)),
            aggressive: Some(false),
            ..CliOverrides::default()
        };
        config.apply_overrides(&overrides);
        assert_eq!(config.trading.ticker, "SOL");
        assert_eq!(config.trading.quantity, Size::new(dec!(2)));
        assert_eq!(config.trading.direction, OrderSide::Sell);
        assert_eq!(config.cooldown.base_wait_secs, 120);
        assert_eq!(config.trading.stop_price, Some(Price::new(dec!(10))));
        assert!(!config.trading.maker_aggressive);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = parse("[trading]\nticker = \"ETH\"\n");
        config.trading.quantity = Size::ZERO;
        assert!(config.validate().is_err());

        let mut config = parse("[trading]\nticker = \"ETH\"\n");
        config.trading.max_orders = 0;
        assert!(config.validate().is_err());

        let mut config = parse("[trading]\nticker = \"ETH\"\n");
        config.trading.take_profit_pct = dec!(-1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[trading]\nticker = \"ETH\"\ndirection = \"sell\"").unwrap();
        let config = BotConfig::from_file(file.path()).unwrap();
        assert_eq!(config.trading.direction, OrderSide::Sell);

        assert!(BotConfig::from_file("/nonexistent/config.toml").is_err());
    }
}
