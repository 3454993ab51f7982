//! Property tests over randomly generated ledgers.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use std::collections::HashMap;
use tpsl::domain::aggregate::summarize;
use tpsl::domain::applier::{apply_decisions, ConflictPolicy};
use tpsl::domain::ledger::Ledger;
use tpsl::domain::rules::{ExitRule, StopLoss, TakeProfit};
use tpsl::domain::transaction::Direction;

const SYMBOLS: [&str; 3] = ["AAPL", "MSFT", "GOOG"];

fn trade() -> impl Strategy<Value = (usize, i8, f64, f64)> {
    (0..SYMBOLS.len(), -1i8..=1, 0.0f64..100.0, 1.0f64..500.0)
}

fn build_ledger(trades: &[(usize, i8, f64, f64)]) -> Ledger {
    let mut ledger = Ledger::new();
    for (i, (sym, dir, volume, price)) in trades.iter().enumerate() {
        let direction = Direction::from_number(f64::from(*dir)).unwrap();
        let time = at("2024-01-01") + chrono::Duration::minutes(i as i64);
        ledger.record(SYMBOLS[*sym], time, *price, direction, *volume);
    }
    ledger
}

proptest! {
    #[test]
    fn latest_position_is_cumulative_signed_volume(trades in prop::collection::vec(trade(), 0..40)) {
        let ledger = build_ledger(&trades);

        let mut expected: HashMap<&str, f64> = HashMap::new();
        for tx in &ledger {
            *expected.entry(tx.symbol.as_str()).or_insert(0.0) +=
                tx.transaction_direction.as_f64() * tx.volume;
        }

        let summaries = summarize(&ledger);
        prop_assert_eq!(summaries.len(), expected.len());
        for (symbol, total) in expected {
            assert_relative_eq!(summaries[symbol].latest_position, total, epsilon = 1e-9);
        }
        prop_assert!(ledger.check_consistency().is_ok());
    }

    #[test]
    fn summarize_is_idempotent(trades in prop::collection::vec(trade(), 0..40)) {
        let ledger = build_ledger(&trades);
        prop_assert_eq!(summarize(&ledger), summarize(&ledger));
    }

    #[test]
    fn applying_decisions_only_reduces_positions(
        trades in prop::collection::vec(trade(), 1..30),
        prices in prop::collection::vec(1.0f64..500.0, SYMBOLS.len()),
    ) {
        let mut ledger = build_ledger(&trades);
        let before: Vec<f64> = SYMBOLS.iter().map(|s| ledger.position(s)).collect();

        let entries: Vec<(&str, f64)> = SYMBOLS.iter().copied().zip(prices).collect();
        let snap = snapshot("2024-06-01", &entries);
        let summaries = summarize(&ledger);
        let tp = TakeProfit::default().decide(&summaries, &snap);
        let sl = StopLoss::default().decide(&summaries, &snap);
        apply_decisions(&tp, &sl, &mut ledger, &snap, ConflictPolicy::Both);

        prop_assert!(ledger.check_consistency().is_ok());
        for (symbol, old) in SYMBOLS.iter().zip(before) {
            let new = ledger.position(symbol);
            prop_assert!(new.abs() <= old.abs() + 1e-9);
            prop_assert!(new == 0.0 || new.signum() == old.signum());
        }
    }
}
