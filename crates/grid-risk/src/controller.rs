//! Kill switches, mismatch detection, and grid-step gating.
//!
//! Every function here is a pure decision over market data and account
//! snapshots. Acting on a decision (market closes, shutdown, notification)
//! belongs to the scheduling loop; nothing in this module talks to a venue.

use crate::error::{RiskError, RiskResult};
use grid_core::{Bbo, OrderInfo, OrderSide, Price, Size};
use rust_decimal::Decimal;

/// Stop-loss / take-profit thresholds in percent of the entry price.
#[derive(Debug, Clone, Copy)]
pub struct SlTpThresholds {
    pub stop_loss_pct: Decimal,
    pub take_profit_pct: Decimal,
}

/// Which kill switch fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlTpTrigger {
    StopLoss,
    TakeProfit,
}

/// What the stop/pause price levels demand this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceAction {
    /// No level breached, keep trading.
    Trade,
    /// Pause level breached: suspend placement, keep managing the book.
    Pause,
    /// Stop level breached: shut down.
    Stop,
}

/// Signed unrealized profit fraction of a position entered at `entry`,
/// marked at `mark`. Positive means in profit for the given direction.
///
/// Returns `None` when there is no usable entry price.
pub fn position_profit_frac(entry: Price, mark: Price, direction: OrderSide) -> Option<Decimal> {
    if !entry.is_positive() {
        return None;
    }
    let frac = match direction {
        OrderSide::Buy => (mark.inner() - entry.inner()) / entry.inner(),
        OrderSide::Sell => (entry.inner() - mark.inner()) / entry.inner(),
    };
    Some(frac)
}

/// Evaluate a profit fraction against SL/TP thresholds.
///
/// Stop-loss wins at `frac <= -stop_loss%`, take-profit at
/// `frac >= take_profit%`; inside the band nothing fires.
pub fn evaluate_sl_tp(profit_frac: Decimal, thresholds: SlTpThresholds) -> Option<SlTpTrigger> {
    let sl_frac = thresholds.stop_loss_pct.abs() / Decimal::ONE_HUNDRED;
    let tp_frac = thresholds.take_profit_pct.abs() / Decimal::ONE_HUNDRED;
    if profit_frac <= -sl_frac {
        Some(SlTpTrigger::StopLoss)
    } else if profit_frac >= tp_frac {
        Some(SlTpTrigger::TakeProfit)
    } else {
        None
    }
}

/// Sum of resting close-order sizes.
pub fn total_close_size(close_orders: &[OrderInfo]) -> Size {
    let total = close_orders
        .iter()
        .fold(Decimal::ZERO, |acc, o| acc + o.size.inner());
    Size::new(total)
}

/// Position/close-order mismatch: the position and the resting close
/// orders have drifted more than `2 x quantity` apart. The drift is a
/// symptom of lost orders or manual interference and is never
/// auto-corrected; the caller must shut down.
pub fn mismatch_exceeded(position: Size, close_orders: &[OrderInfo], quantity: Size) -> bool {
    let diff = (position.inner() - total_close_size(close_orders).inner()).abs();
    diff > Decimal::TWO * quantity.inner()
}

/// Price of the close order the market would reach first: lowest for a
/// buy strategy (sell closes above), highest for a sell strategy.
pub fn nearest_close_price(close_orders: &[OrderInfo], direction: OrderSide) -> Option<Price> {
    let prices = close_orders.iter().map(|o| o.price);
    match direction {
        OrderSide::Buy => prices.min(),
        OrderSide::Sell => prices.max(),
    }
}

/// Grid-step gate: may a new open order be placed?
///
/// Compares the nearest resting close price with the close price a fill
/// at the current touch would produce; the new rung must improve on the
/// nearest one by more than `grid_step%`. An empty grid always passes.
pub fn grid_gate(
    close_orders: &[OrderInfo],
    bbo: &Bbo,
    direction: OrderSide,
    take_profit_pct: Decimal,
    grid_step_pct: Decimal,
) -> RiskResult<bool> {
    let Some(nearest) = nearest_close_price(close_orders, direction) else {
        return Ok(true);
    };
    require_valid(bbo)?;

    let tp = take_profit_pct / Decimal::ONE_HUNDRED;
    let threshold = Decimal::ONE + grid_step_pct / Decimal::ONE_HUNDRED;
    let ratio = match direction {
        OrderSide::Buy => {
            let new_close = bbo.ask.inner() * (Decimal::ONE + tp);
            nearest.inner() / new_close
        }
        OrderSide::Sell => {
            let new_close = bbo.bid.inner() * (Decimal::ONE - tp);
            new_close / nearest.inner()
        }
    };
    Ok(ratio > threshold)
}

/// Evaluate absolute stop/pause price levels against the touch.
///
/// A buy strategy is endangered by a rising market and watches the ask;
/// a sell strategy watches the bid falling. Stop wins over pause. With
/// no levels configured the book is not consulted at all.
pub fn price_trigger(
    bbo: &Bbo,
    direction: OrderSide,
    stop_price: Option<Price>,
    pause_price: Option<Price>,
) -> RiskResult<PriceAction> {
    if stop_price.is_none() && pause_price.is_none() {
        return Ok(PriceAction::Trade);
    }
    require_valid(bbo)?;

    let breached = |level: Price| match direction {
        OrderSide::Buy => bbo.ask >= level,
        OrderSide::Sell => bbo.bid <= level,
    };
    if stop_price.is_some_and(breached) {
        return Ok(PriceAction::Stop);
    }
    if pause_price.is_some_and(breached) {
        return Ok(PriceAction::Pause);
    }
    Ok(PriceAction::Trade)
}

fn require_valid(bbo: &Bbo) -> RiskResult<()> {
    if !bbo.is_valid() {
        return Err(RiskError::InvalidMarketData(format!(
            "no bid/ask data available (bid={}, ask={})",
            bbo.bid, bbo.ask
        )));
    }
    Ok(())
}
