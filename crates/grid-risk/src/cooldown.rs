//! Cooldown between open orders, scaled by grid fullness.
//!
//! A fuller grid means the market has been moving against the strategy,
//! so new rungs are added more slowly; a near-empty grid re-arms fast.
//! The curve is configurable; the defaults step at 2/3, 1/3 and 1/6 of
//! the maximum order count with multipliers 2x, 1x, 0.5x and 0.25x of
//! the base wait.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

fn default_base_wait_secs() -> u64 {
    450
}

fn default_floor_secs() -> u64 {
    60
}

fn default_tier_fractions() -> [Decimal; 3] {
    [
        Decimal::TWO / Decimal::from(3),
        Decimal::ONE / Decimal::from(3),
        Decimal::ONE / Decimal::from(6),
    ]
}

fn default_tier_multipliers() -> [Decimal; 4] {
    [
        Decimal::TWO,
        Decimal::ONE,
        Decimal::new(5, 1),
        Decimal::new(25, 2),
    ]
}

/// Cooldown curve parameters.
///
/// `tier_fractions` must be sorted descending; fullness at or above
/// fraction `i` selects `tier_multipliers[i]`, anything below the last
/// fraction selects the final multiplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooldownPolicy {
    /// Base wait between open orders, in seconds.
    #[serde(default = "default_base_wait_secs")]
    pub base_wait_secs: u64,
    /// Lower bound on any computed cooldown, in seconds.
    #[serde(default = "default_floor_secs")]
    pub floor_secs: u64,
    #[serde(default = "default_tier_fractions")]
    pub tier_fractions: [Decimal; 3],
    #[serde(default = "default_tier_multipliers")]
    pub tier_multipliers: [Decimal; 4],
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            base_wait_secs: default_base_wait_secs(),
            floor_secs: default_floor_secs(),
            tier_fractions: default_tier_fractions(),
            tier_multipliers: default_tier_multipliers(),
        }
    }
}

impl CooldownPolicy {
    /// Cooldown duration for a grid with `close_count` of `max_orders`
    /// rungs filled. `None` means the grid is full and placement is
    /// blocked outright.
    pub fn cooldown_for(&self, close_count: usize, max_orders: usize) -> Option<Duration> {
        if max_orders > 0 && close_count >= max_orders {
            return None;
        }
        let fullness = if max_orders == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(close_count as u64) / Decimal::from(max_orders as u64)
        };
        let multiplier = self
            .tier_fractions
            .iter()
            .position(|frac| fullness >= *frac)
            .map(|i| self.tier_multipliers[i])
            .unwrap_or(self.tier_multipliers[3]);

        let secs = (Decimal::from(self.base_wait_secs) * multiplier)
            .to_u64()
            .unwrap_or(self.base_wait_secs);
        Some(Duration::from_secs(secs.max(self.floor_secs)))
    }
}

/// Verdict of the cooldown gate for this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownGate {
    /// Cooldown elapsed (or released), place the next open order.
    Ready,
    /// The grid is full; no cooldown applies, placement is blocked.
    Blocked,
    /// Still cooling; remaining time until ready.
    Cooling(Duration),
}

/// Tracks the last open-order time and the grid trend between cycles.
#[derive(Debug)]
pub struct CooldownTracker {
    last_open_at: Option<Instant>,
    last_close_count: usize,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self {
            last_open_at: None,
            last_close_count: 0,
        }
    }

    /// Record that an open order was just placed.
    pub fn record_open(&mut self) {
        self.record_open_at(Instant::now());
    }

    fn record_open_at(&mut self, at: Instant) {
        self.last_open_at = Some(at);
    }

    /// Evaluate the gate for the current grid state.
    pub fn gate(
        &mut self,
        policy: &CooldownPolicy,
        close_count: usize,
        max_orders: usize,
    ) -> CooldownGate {
        self.gate_at(policy, close_count, max_orders, Instant::now())
    }

    fn gate_at(
        &mut self,
        policy: &CooldownPolicy,
        close_count: usize,
        max_orders: usize,
        now: Instant,
    ) -> CooldownGate {
        // A shrinking grid means a close order filled: the strategy is
        // taking profit and the cooldown releases immediately.
        if close_count < self.last_close_count {
            self.last_close_count = close_count;
            return CooldownGate::Ready;
        }
        self.last_close_count = close_count;

        let Some(cooldown) = policy.cooldown_for(close_count, max_orders) else {
            return CooldownGate::Blocked;
        };

        // Rungs found at startup imply a recent open in a previous run.
        if self.last_open_at.is_none() && close_count > 0 {
            self.last_open_at = Some(now);
        }

        match self.last_open_at {
            None => CooldownGate::Ready,
            Some(last) => {
                let elapsed = now.duration_since(last);
                if elapsed >= cooldown {
                    CooldownGate::Ready
                } else {
                    let remaining = cooldown - elapsed;
                    debug!(remaining_secs = remaining.as_secs(), "Cooldown active");
                    CooldownGate::Cooling(remaining)
                }
            }
        }
    }
}
