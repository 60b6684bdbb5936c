//! Push-channel fill signal.
//!
//! The gateway's notification callback runs on its own dispatch task; the
//! engine blocks on [`OrderMonitor::wait_filled`] / [`wait_canceled`]
//! instead of polling. State lives behind a mutex and wake-ups go through
//! a [`tokio::sync::Notify`], so the callback never touches the engine's
//! scheduler directly.
//!
//! The monitor tracks the single in-flight open order by contract and
//! order kind rather than by id: the strategy is single-order-in-flight by
//! construction, and matching on kind closes the race where a fill event
//! arrives before the placement response carrying the order id.
//!
//! [`wait_canceled`]: OrderMonitor::wait_canceled

use grid_core::{OrderKind, OrderStatus, OrderUpdate, Price, Size};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Point-in-time view of the monitored open order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillSnapshot {
    /// Latest status reported over the push channel, if any.
    pub status: Option<OrderStatus>,
    /// Cumulative filled size.
    pub filled_size: Size,
    /// Fill price, when the venue reported one.
    pub filled_price: Option<Price>,
}

#[derive(Debug, Default)]
struct MonitorState {
    armed: bool,
    status: Option<OrderStatus>,
    filled_size: Size,
    filled_price: Option<Price>,
}

/// Order-lifecycle signal shared between the push-channel callback and the
/// reconciliation engine.
pub struct OrderMonitor {
    contract_id: String,
    state: Mutex<MonitorState>,
    changed: Notify,
}

impl OrderMonitor {
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: contract_id.into(),
            state: Mutex::new(MonitorState::default()),
            changed: Notify::new(),
        }
    }

    /// Reset the signal before placing a new open order.
    pub fn arm(&self) {
        let mut state = self.state.lock();
        state.armed = true;
        state.status = None;
        state.filled_size = Size::ZERO;
        state.filled_price = None;
    }

    /// Handle a push-channel event. Safe to call from any thread.
    pub fn on_update(&self, update: &OrderUpdate) {
        if update.contract_id != self.contract_id || update.kind != OrderKind::Open {
            return;
        }

        {
            let mut state = self.state.lock();
            if !state.armed {
                debug!(order_id = %update.order_id, status = %update.status,
                       "Open-order update with no armed monitor, ignoring");
                return;
            }
            state.status = Some(update.status);
            match update.status {
                OrderStatus::Filled => {
                    state.filled_size = update.filled_size;
                    state.filled_price = Some(update.price);
                }
                OrderStatus::PartiallyFilled | OrderStatus::Canceled => {
                    // filled_size is cumulative; keep the latest report.
                    state.filled_size = update.filled_size;
                }
                _ => {}
            }
        }

        info!(
            order_id = %update.order_id,
            kind = %update.kind,
            status = %update.status,
            size = %update.size,
            price = %update.price,
            "Order update"
        );
        self.changed.notify_waiters();
    }

    /// Current view of the monitored order.
    pub fn snapshot(&self) -> FillSnapshot {
        let state = self.state.lock();
        FillSnapshot {
            status: state.status,
            filled_size: state.filled_size,
            filled_price: state.filled_price,
        }
    }

    /// Wait until the open order reports `FILLED`, bounded by `timeout`.
    pub async fn wait_filled(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| s.status == Some(OrderStatus::Filled))
            .await
    }

    /// Wait until the open order reports `CANCELED`, bounded by `timeout`.
    pub async fn wait_canceled(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| s.status == Some(OrderStatus::Canceled))
            .await
    }

    async fn wait_for(&self, timeout: Duration, pred: impl Fn(&MonitorState) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register for wake-up before checking, so an update landing
            // between the check and the await is not lost.
            let notified = self.changed.notified();
            if pred(&self.state.lock()) {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return pred(&self.state.lock());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_core::OrderSide;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn update(status: OrderStatus, filled: Size, price: Price) -> OrderUpdate {
        OrderUpdate {
            order_id: "1".to_string(),
            contract_id: "ETH-PERP".to_string(),
            side: OrderSide::Buy,
            kind: OrderKind::Open,
            status,
            size: Size::new(dec!(1)),
            price,
            filled_size: filled,
        }
    }

    #[tokio::test]
    async fn test_fill_event_wakes_waiter() {
        let monitor = Arc::new(OrderMonitor::new("ETH-PERP"));
        monitor.arm();

        let waiter = monitor.clone();
        let handle =
            tokio::spawn(async move { waiter.wait_filled(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;

        monitor.on_update(&update(
            OrderStatus::Filled,
            Size::new(dec!(1)),
            Price::new(dec!(100.09)),
        ));

        assert!(handle.await.unwrap());
        let snap = monitor.snapshot();
        assert_eq!(snap.filled_size, Size::new(dec!(1)));
        assert_eq!(snap.filled_price, Some(Price::new(dec!(100.09))));
    }

    #[tokio::test]
    async fn test_event_before_wait_is_not_lost() {
        let monitor = OrderMonitor::new("ETH-PERP");
        monitor.arm();
        monitor.on_update(&update(
            OrderStatus::Filled,
            Size::new(dec!(1)),
            Price::new(dec!(100)),
        ));
        assert!(monitor.wait_filled(Duration::from_millis(10)).await);
    }

    #[tokio::test]
    async fn test_wait_times_out_without_fill() {
        let monitor = OrderMonitor::new("ETH-PERP");
        monitor.arm();
        assert!(!monitor.wait_filled(Duration::from_millis(20)).await);
    }

    #[tokio::test]
    async fn test_cumulative_partial_fills() {
        let monitor = OrderMonitor::new("ETH-PERP");
        monitor.arm();
        monitor.on_update(&update(
            OrderStatus::PartiallyFilled,
            Size::new(dec!(0.4)),
            Price::new(dec!(100)),
        ));
        monitor.on_update(&update(
            OrderStatus::PartiallyFilled,
            Size::new(dec!(0.7)),
            Price::new(dec!(100)),
        ));
        monitor.on_update(&update(
            OrderStatus::Canceled,
            Size::new(dec!(0.7)),
            Price::new(dec!(100)),
        ));
        assert!(monitor.wait_canceled(Duration::from_millis(10)).await);
        assert_eq!(monitor.snapshot().filled_size, Size::new(dec!(0.7)));
    }

    #[tokio::test]
    async fn test_other_contract_and_close_orders_ignored() {
        let monitor = OrderMonitor::new("ETH-PERP");
        monitor.arm();

        let mut other = update(OrderStatus::Filled, Size::new(dec!(1)), Price::new(dec!(1)));
        other.contract_id = "BTC-PERP".to_string();
        monitor.on_update(&other);
        assert_eq!(monitor.snapshot().status, None);

        let mut close = update(OrderStatus::Filled, Size::new(dec!(1)), Price::new(dec!(1)));
        close.kind = OrderKind::Close;
        monitor.on_update(&close);
        assert_eq!(monitor.snapshot().status, None);
    }

    #[tokio::test]
    async fn test_arm_clears_previous_cycle() {
        let monitor = OrderMonitor::new("ETH-PERP");
        monitor.arm();
        monitor.on_update(&update(
            OrderStatus::Filled,
            Size::new(dec!(1)),
            Price::new(dec!(100)),
        ));
        monitor.arm();
        let snap = monitor.snapshot();
        assert_eq!(snap.status, None);
        assert_eq!(snap.filled_size, Size::ZERO);
        assert_eq!(snap.filled_price, None);
    }
}
