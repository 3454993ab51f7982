//! Append-only transaction ledger.
//!
//! Insertion order is chronological order. Existing rows are never handed out
//! mutably, so the only way the ledger changes is by growing.

use chrono::NaiveDateTime;
use std::collections::HashMap;

use super::error::LedgerError;
use super::transaction::{Direction, Transaction};

const POSITION_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    rows: Vec<Transaction>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Transaction>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.rows.iter()
    }

    /// Append a fully formed row.
    pub fn push(&mut self, tx: Transaction) {
        self.rows.push(tx);
    }

    /// Most recent row for `symbol`, by ledger order.
    pub fn last_for(&self, symbol: &str) -> Option<&Transaction> {
        self.rows.iter().rev().find(|tx| tx.symbol == symbol)
    }

    /// Current signed position for `symbol`; zero if it never traded.
    pub fn position(&self, symbol: &str) -> f64 {
        self.last_for(symbol).map_or(0.0, |tx| tx.latest_position)
    }

    /// Time of the newest row.
    pub fn latest_time(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|tx| tx.time).max()
    }

    /// Append a transaction, deriving `latest_position` from the previous row
    /// for the same symbol. Returns the appended row.
    pub fn record(
        &mut self,
        symbol: &str,
        time: NaiveDateTime,
        price: f64,
        direction: Direction,
        volume: f64,
    ) -> &Transaction {
        let previous = self.position(symbol);
        self.rows.push(Transaction {
            symbol: symbol.to_string(),
            time,
            transaction_price: price,
            transaction_direction: direction,
            volume,
            latest_position: previous + direction.as_f64() * volume,
        });
        &self.rows[self.rows.len() - 1]
    }

    /// Verify the per-row invariants: non-decreasing time, positive price,
    /// non-negative volume and `latest_position` equal to the running
    /// signed-volume total per symbol.
    pub fn check_consistency(&self) -> Result<(), LedgerError> {
        let mut running: HashMap<&str, f64> = HashMap::new();
        let mut previous: Option<NaiveDateTime> = None;

        for (row, tx) in self.rows.iter().enumerate() {
            if let Some(prev) = previous.filter(|prev| tx.time < *prev) {
                return Err(LedgerError::OutOfOrder {
                    row,
                    symbol: tx.symbol.clone(),
                    previous: prev,
                    current: tx.time,
                });
            }
            previous = Some(tx.time);

            if !(tx.transaction_price > 0.0) {
                return Err(LedgerError::NonPositivePrice {
                    row,
                    symbol: tx.symbol.clone(),
                    price: tx.transaction_price,
                });
            }
            if !(tx.volume >= 0.0) {
                return Err(LedgerError::NegativeVolume {
                    row,
                    symbol: tx.symbol.clone(),
                    volume: tx.volume,
                });
            }

            let total = running.entry(tx.symbol.as_str()).or_insert(0.0);
            *total += tx.signed_volume();
            let scale = total.abs().max(1.0);
            if (*total - tx.latest_position).abs() > POSITION_TOLERANCE * scale {
                return Err(LedgerError::PositionMismatch {
                    row,
                    symbol: tx.symbol.clone(),
                    expected: *total,
                    found: tx.latest_position,
                });
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
