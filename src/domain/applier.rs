//! Turn rule decisions into closing transactions on the ledger.

use std::collections::BTreeSet;
use std::fmt;

use super::ledger::Ledger;
use super::price::PriceSnapshot;
use super::rules::Decisions;
use super::transaction::{Direction, Transaction};

/// What to do when take-profit and stop-loss both fire for a symbol on the
/// same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Apply only the take-profit decision.
    #[default]
    TakeProfitFirst,
    /// Sum both fractions, clamped to [-1, 1], and apply once.
    Net,
    /// Apply take-profit, then stop-loss against the reduced position.
    Both,
}

impl ConflictPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "take_profit_first" => Some(ConflictPolicy::TakeProfitFirst),
            "net" => Some(ConflictPolicy::Net),
            "both" => Some(ConflictPolicy::Both),
            _ => None,
        }
    }

    fn fractions(self, take_profit: f64, stop_loss: f64) -> Vec<f64> {
        match self {
            ConflictPolicy::TakeProfitFirst => {
                if take_profit != 0.0 {
                    vec![take_profit]
                } else if stop_loss != 0.0 {
                    vec![stop_loss]
                } else {
                    vec![]
                }
            }
            ConflictPolicy::Net => {
                let net = (take_profit + stop_loss).clamp(-1.0, 1.0);
                if net != 0.0 { vec![net] } else { vec![] }
            }
            ConflictPolicy::Both => [take_profit, stop_loss]
                .into_iter()
                .filter(|f| *f != 0.0)
                .collect(),
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictPolicy::TakeProfitFirst => "take_profit_first",
            ConflictPolicy::Net => "net",
            ConflictPolicy::Both => "both",
        };
        f.write_str(name)
    }
}

/// Append a closing transaction for every traded symbol with a non-zero
/// decision, stamped with the snapshot time and priced at the snapshot price.
///
/// The closing trade goes against the current position and its volume is
/// `|position| × |fraction|`. Returns the appended rows in append order.
pub fn apply_decisions(
    take_profit: &Decisions,
    stop_loss: &Decisions,
    ledger: &mut Ledger,
    snapshot: &PriceSnapshot,
    policy: ConflictPolicy,
) -> Vec<Transaction> {
    let symbols: BTreeSet<String> = ledger.iter().map(|tx| tx.symbol.clone()).collect();
    let mut appended = Vec::new();

    for symbol in &symbols {
        let tp = take_profit.get(symbol).copied().unwrap_or(0.0);
        let sl = stop_loss.get(symbol).copied().unwrap_or(0.0);
        let fractions = policy.fractions(tp, sl);
        if fractions.is_empty() {
            continue;
        }
        let Some(price) = snapshot.price(symbol).filter(|p| *p > 0.0 && p.is_finite()) else {
            continue;
        };

        for fraction in fractions {
            let previous = ledger.position(symbol);
            if previous == 0.0 {
                break;
            }
            let volume = previous.abs() * fraction.abs().min(1.0);
            let direction = Direction::from_sign(previous).opposite();
            let tx = ledger.record(symbol, snapshot.time, price, direction, volume);
            appended.push(tx.clone());
        }
    }
    appended
}
