//! Per-symbol average entry price and latest position.

use std::collections::BTreeMap;

use super::ledger::Ledger;
use super::transaction::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSummary {
    /// Mean `transaction_price` over every row for the symbol.
    pub avg_price: f64,
    pub latest_position: f64,
    pub latest_direction: Direction,
}

impl PositionSummary {
    pub fn is_open(&self) -> bool {
        self.latest_position != 0.0
    }
}

pub type Summaries = BTreeMap<String, PositionSummary>;

/// Group the ledger by symbol in one stable pass. The last row seen for a
/// symbol supplies its latest position, so equal timestamps resolve to the
/// most recently inserted row.
pub fn summarize(ledger: &Ledger) -> Summaries {
    let mut acc: BTreeMap<&str, (f64, usize, f64)> = BTreeMap::new();

    for tx in ledger {
        let entry = acc.entry(tx.symbol.as_str()).or_insert((0.0, 0, 0.0));
        entry.0 += tx.transaction_price;
        entry.1 += 1;
        entry.2 = tx.latest_position;
    }

    acc.into_iter()
        .map(|(symbol, (price_sum, count, latest))| {
            (
                symbol.to_string(),
                PositionSummary {
                    avg_price: price_sum / count as f64,
                    latest_position: latest,
                    latest_direction: Direction::from_sign(latest),
                },
            )
        })
        .collect()
}
