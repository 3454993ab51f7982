//! Take-profit and stop-loss exit rules.
//!
//! A decision is a signed fraction in [-1, 1] of the open position to close.
//! Its sign is the direction of the closing trade, so a long position that
//! should be fully closed gets -1 and a short one gets +1.

use std::collections::BTreeMap;

use super::aggregate::{PositionSummary, Summaries};
use super::price::PriceSnapshot;

pub type Decisions = BTreeMap<String, f64>;

/// Return thresholds for one rule. Stop-loss compares against the negated
/// values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Return beyond which the whole position is closed.
    pub full: f64,
    /// Return beyond which `partial_fraction` of the position is closed.
    pub partial: f64,
    pub partial_fraction: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            full: 0.3,
            partial: 0.1,
            partial_fraction: 0.5,
        }
    }
}

/// An exit strategy evaluated once per tick.
pub trait ExitRule {
    fn name(&self) -> &str;

    /// Decision for every symbol in `snapshot`. Symbols without an open
    /// position or without a usable price get 0.
    fn decide(&self, summaries: &Summaries, snapshot: &PriceSnapshot) -> Decisions;
}

/// `direction × (price − avg_price) / avg_price`, or `None` when the inputs
/// cannot produce a meaningful return.
pub fn signed_return(summary: &PositionSummary, price: f64) -> Option<f64> {
    if !(summary.avg_price > 0.0) || !summary.avg_price.is_finite() {
        return None;
    }
    if !(price > 0.0) || !price.is_finite() {
        return None;
    }
    Some(summary.latest_direction.as_f64() * (price - summary.avg_price) / summary.avg_price)
}

pub fn has_signal(decisions: &Decisions) -> bool {
    decisions.values().any(|&d| d != 0.0)
}

fn evaluate<F>(summaries: &Summaries, snapshot: &PriceSnapshot, classify: F) -> Decisions
where
    F: Fn(f64) -> f64,
{
    let mut decisions: Decisions = snapshot.symbols().map(|s| (s.to_string(), 0.0)).collect();

    for (symbol, summary) in summaries.iter().filter(|(_, s)| s.is_open()) {
        let Some(price) = snapshot.price(symbol) else {
            continue;
        };
        let Some(r) = signed_return(summary, price) else {
            continue;
        };
        let fraction = classify(r);
        if fraction != 0.0 {
            decisions.insert(symbol.clone(), -fraction * summary.latest_direction.as_f64());
        }
    }
    decisions
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TakeProfit {
    pub thresholds: Thresholds,
}

impl TakeProfit {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl ExitRule for TakeProfit {
    fn name(&self) -> &str {
        "take_profit"
    }

    fn decide(&self, summaries: &Summaries, snapshot: &PriceSnapshot) -> Decisions {
        let t = self.thresholds;
        evaluate(summaries, snapshot, |r| {
            if r > t.full {
                1.0
            } else if r > t.partial {
                t.partial_fraction
            } else {
                0.0
            }
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StopLoss {
    pub thresholds: Thresholds,
}

impl StopLoss {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }
}

impl ExitRule for StopLoss {
    fn name(&self) -> &str {
        "stop_loss"
    }

    fn decide(&self, summaries: &Summaries, snapshot: &PriceSnapshot) -> Decisions {
        let t = self.thresholds;
        evaluate(summaries, snapshot, |r| {
            if r < -t.full {
                1.0
            } else if r < -t.partial {
                t.partial_fraction
            } else {
                0.0
            }
        })
    }
}
