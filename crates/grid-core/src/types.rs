//! Market data types.

use crate::Price;
use serde::{Deserialize, Serialize};

/// Best bid and offer snapshot.
///
/// Gateways return a zeroed `Bbo` on transient market-data failures;
/// callers must check `is_valid()` before pricing against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbo {
    /// Best bid price.
    pub bid: Price,
    /// Best ask price.
    pub ask: Price,
}

impl Bbo {
    pub fn new(bid: Price, ask: Price) -> Self {
        Self { bid, ask }
    }

    /// Both sides present and uncrossed.
    pub fn is_valid(&self) -> bool {
        self.bid.is_positive() && self.ask.is_positive() && self.bid < self.ask
    }

    /// Bid/ask midpoint, used as the mark price for unrealized P&L.
    ///
    /// Returns None when the book is invalid.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.is_valid() {
            return None;
        }
        Some(Price::midpoint(self.bid, self.ask))
    }
}
