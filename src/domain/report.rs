//! Profit accounting over a finished ledger.

use std::collections::BTreeMap;

use super::ledger::Ledger;

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitReport {
    pub initial_money: f64,
    /// Initial money plus the cash flow of every row.
    pub market_value: f64,
    pub profit: f64,
    /// `profit / initial_money`; zero when no money was committed.
    pub profit_pct: f64,
    pub per_symbol: BTreeMap<String, f64>,
}

impl ProfitReport {
    /// Each row contributes `-price × direction × volume`: buys spend, sells
    /// receive. Open positions are not marked to market.
    pub fn compute(initial_money: f64, ledger: &Ledger) -> Self {
        let mut per_symbol: BTreeMap<String, f64> = BTreeMap::new();
        let mut market_value = initial_money;

        for tx in ledger {
            let flow = tx.cash_flow();
            market_value += flow;
            *per_symbol.entry(tx.symbol.clone()).or_insert(0.0) += flow;
        }

        let profit = market_value - initial_money;
        let profit_pct = if initial_money > 0.0 {
            profit / initial_money
        } else {
            0.0
        };

        ProfitReport {
            initial_money,
            market_value,
            profit,
            profit_pct,
            per_symbol,
        }
    }
}
