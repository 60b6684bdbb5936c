//! Append-only CSV log of executed transactions.
//!
//! One file per contract, written on every terminal fill or
//! cancel-with-fill event. The file is an audit trail: it is never read
//! back by the bot.

use crate::error::TelemetryResult;
use chrono::Local;
use grid_core::{OrderSide, Price, Size};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const HEADER: [&str; 6] = ["Timestamp", "OrderID", "Side", "Quantity", "Price", "Status"];

/// Per-contract CSV transaction log.
pub struct TransactionLog {
    path: PathBuf,
}

impl TransactionLog {
    /// Log for `contract_id`, stored under `dir` as
    /// `<contract_id>_transactions_log.csv`.
    pub fn new(contract_id: &str, dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir
                .as_ref()
                .join(format!("{contract_id}_transactions_log.csv")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one transaction row, writing the header on first use.
    /// The row is flushed to disk before returning.
    pub fn record(
        &self,
        order_id: &str,
        side: OrderSide,
        quantity: Size,
        price: Price,
        status: &str,
    ) -> TelemetryResult<()> {
        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(HEADER)?;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        writer.write_record([
            timestamp.as_str(),
            order_id,
            &side.to_string(),
            &quantity.to_string(),
            &price.to_string(),
            status,
        ])?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::new("ETH-PERP", dir.path());

        log.record(
            "order-1",
            OrderSide::Buy,
            Size::new(dec!(0.5)),
            Price::new(dec!(100.09)),
            "FILLED",
        )
        .unwrap();
        log.record(
            "order-2",
            OrderSide::Sell,
            Size::new(dec!(0.5)),
            Price::new(dec!(101.10)),
            "CANCELED",
        )
        .unwrap();

        let contents = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Timestamp,OrderID,Side,Quantity,Price,Status");
        assert!(lines[1].contains("order-1"));
        assert!(lines[1].ends_with("buy,0.5,100.09,FILLED"));
        assert!(lines[2].contains("order-2"));
    }

    #[test]
    fn test_file_named_after_contract() {
        let dir = tempfile::tempdir().unwrap();
        let log = TransactionLog::new("BTC-PERP", dir.path());
        assert!(log
            .path()
            .ends_with("BTC-PERP_transactions_log.csv"));
    }
}
