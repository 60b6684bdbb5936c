//! Maker-safe order pricing.
//!
//! Produces limit prices that rest on the book without crossing the
//! spread, which post-only acceptance requires and which keeps the
//! strategy on maker fees.

use crate::error::{EngineError, EngineResult};
use grid_core::{Bbo, OrderSide, Price};
use rust_decimal::Decimal;

/// Pricing policy parameterized by tick size and aggressiveness.
///
/// The aggressive variant prices half a tick closer to the touch; after
/// tick-rounding the price is still guaranteed not to cross.
#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    tick_size: Price,
    aggressive: bool,
}

impl PricingPolicy {
    pub fn new(tick_size: Price, aggressive: bool) -> Self {
        Self {
            tick_size,
            aggressive,
        }
    }

    pub fn tick_size(&self) -> Price {
        self.tick_size
    }

    fn offset(&self) -> Decimal {
        if self.aggressive {
            self.tick_size.inner() / Decimal::TWO
        } else {
            self.tick_size.inner()
        }
    }

    /// Price for a new open order against the current book.
    ///
    /// Buy: `ask - offset`; sell: `bid + offset`. Fails with
    /// `InvalidMarketData` on an empty or crossed book.
    pub fn open_price(&self, bbo: &Bbo, side: OrderSide) -> EngineResult<Price> {
        self.require_valid(bbo)?;
        let raw = match side {
            OrderSide::Buy => Price::new(bbo.ask.inner() - self.offset()),
            OrderSide::Sell => Price::new(bbo.bid.inner() + self.offset()),
        };
        Ok(self.finalize(raw, bbo, side))
    }

    /// Price for a close order at a caller-supplied target.
    ///
    /// A target that would cross (sell at/below bid, buy at/above ask) is
    /// clamped one offset inside the touch; otherwise the target is used
    /// unmodified.
    pub fn close_price(&self, bbo: &Bbo, target: Price, side: OrderSide) -> EngineResult<Price> {
        self.require_valid(bbo)?;
        let raw = match side {
            OrderSide::Sell if target <= bbo.bid => Price::new(bbo.bid.inner() + self.offset()),
            OrderSide::Buy if target >= bbo.ask => Price::new(bbo.ask.inner() - self.offset()),
            _ => target,
        };
        Ok(self.finalize(raw, bbo, side))
    }

    fn require_valid(&self, bbo: &Bbo) -> EngineResult<()> {
        if !bbo.is_valid() {
            return Err(EngineError::InvalidMarketData(format!(
                "no bid/ask data available (bid={}, ask={})",
                bbo.bid, bbo.ask
            )));
        }
        Ok(())
    }

    /// Round to the nearest tick; if rounding reached the touch, step one
    /// tick back toward the passive side so the order can never cross.
    fn finalize(&self, raw: Price, bbo: &Bbo, side: OrderSide) -> Price {
        let mut price = raw.round_to_tick(self.tick_size);
        match side {
            OrderSide::Buy => {
                if price >= bbo.ask {
                    price = Price::new(bbo.ask.inner() - self.tick_size.inner())
                        .round_to_tick(self.tick_size);
                }
            }
            OrderSide::Sell => {
                if price <= bbo.bid {
                    price = Price::new(bbo.bid.inner() + self.tick_size.inner())
                        .round_to_tick(self.tick_size);
                }
            }
        }
        price
    }
}
