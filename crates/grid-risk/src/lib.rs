//! Risk controls for the grid strategy.
//!
//! Pure decision functions over market and account snapshots (kill
//! switches, mismatch detection, grid-step and stop/pause gating) plus
//! the stateful cooldown tracker. Acting on the decisions is the
//! scheduling loop's job.

pub mod controller;
pub mod cooldown;
pub mod error;

pub use controller::{
    evaluate_sl_tp, grid_gate, mismatch_exceeded, nearest_close_price, position_profit_frac,
    price_trigger, total_close_size, PriceAction, SlTpThresholds, SlTpTrigger,
};
pub use cooldown::{CooldownGate, CooldownPolicy, CooldownTracker};
pub use error::{RiskError, RiskResult};
