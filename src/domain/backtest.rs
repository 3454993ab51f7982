//! Backtest driver: replays a price series against the ledger tick by tick.
//!
//! BacktestConfig defines the run parameters; [`step`] is a single tick and is
//! shared with simulated trading.

use chrono::NaiveDate;
use std::fmt;
use tracing::{debug, info, warn};

use super::aggregate::{summarize, Summaries};
use super::applier::{apply_decisions, ConflictPolicy};
use super::ledger::Ledger;
use super::price::{PriceSeries, PriceSnapshot};
use super::report::ProfitReport;
use super::rules::{has_signal, ExitRule, Thresholds};
use super::transaction::Transaction;

pub use super::warning::{TickWarning, WarningKind};

/// Sampling interval of the price data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Days,
    Minutes,
}

impl Interval {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "days" | "day" => Some(Interval::Days),
            "minutes" | "minute" => Some(Interval::Minutes),
            _ => None,
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interval::Days => f.write_str("days"),
            Interval::Minutes => f.write_str("minutes"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_money: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub conflict_policy: ConflictPolicy,
    pub take_profit: Thresholds,
    pub stop_loss: Thresholds,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub appended: Vec<Transaction>,
    pub warnings: Vec<TickWarning>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub ledger: Ledger,
    /// Every row appended during the run, in order.
    pub actions: Vec<Transaction>,
    pub warnings: Vec<TickWarning>,
    pub ticks_processed: usize,
    pub report: ProfitReport,
}

fn check_snapshot(summaries: &Summaries, snapshot: &PriceSnapshot) -> Vec<TickWarning> {
    let mut warnings = Vec::new();

    for (symbol, _) in summaries.iter().filter(|(_, s)| s.is_open()) {
        let kind = match snapshot.price(symbol) {
            None => WarningKind::MissingPrice,
            Some(p) if !(p > 0.0) || !p.is_finite() => WarningKind::InvalidPrice(p),
            Some(_) => continue,
        };
        warnings.push(TickWarning::for_symbol(snapshot.time, symbol, kind));
    }

    for (symbol, &p) in &snapshot.prices {
        if !summaries.contains_key(symbol) && (!(p > 0.0) || !p.is_finite()) {
            warnings.push(TickWarning::for_symbol(
                snapshot.time,
                symbol,
                WarningKind::InvalidPrice(p),
            ));
        }
    }
    warnings
}

/// Evaluate both rules against one snapshot and apply any decision.
///
/// A snapshot older than the newest ledger row is skipped whole, so appended
/// rows never go back in time.
pub fn step(
    ledger: &mut Ledger,
    snapshot: &PriceSnapshot,
    take_profit: &dyn ExitRule,
    stop_loss: &dyn ExitRule,
    policy: ConflictPolicy,
) -> TickOutcome {
    if let Some(latest) = ledger.latest_time().filter(|latest| snapshot.time < *latest) {
        warn!(time = %snapshot.time, %latest, "tick precedes ledger, skipping tick");
        return TickOutcome {
            appended: Vec::new(),
            warnings: vec![TickWarning::for_tick(
                Some(snapshot.time),
                WarningKind::StaleTick { latest },
            )],
        };
    }

    let summaries = summarize(ledger);
    let warnings = check_snapshot(&summaries, snapshot);
    for w in &warnings {
        warn!("{w}, skipping symbol this tick");
    }

    let tp = take_profit.decide(&summaries, snapshot);
    let sl = stop_loss.decide(&summaries, snapshot);

    let appended = if has_signal(&tp) || has_signal(&sl) {
        apply_decisions(&tp, &sl, ledger, snapshot, policy)
    } else {
        Vec::new()
    };

    for tx in &appended {
        debug!(
            time = %tx.time,
            symbol = %tx.symbol,
            price = tx.transaction_price,
            direction = %tx.transaction_direction,
            volume = tx.volume,
            position = tx.latest_position,
            "closing transaction"
        );
    }

    TickOutcome { appended, warnings }
}

/// Replay `series` in order against `ledger` and report total profit.
pub fn run_backtest(
    config: &BacktestConfig,
    series: &PriceSeries,
    mut ledger: Ledger,
    take_profit: &dyn ExitRule,
    stop_loss: &dyn ExitRule,
) -> BacktestResult {
    let mut actions = Vec::new();
    let mut warnings = Vec::new();

    info!(
        ticks = series.len(),
        rows = ledger.len(),
        take_profit = take_profit.name(),
        stop_loss = stop_loss.name(),
        policy = %config.conflict_policy,
        "starting backtest"
    );

    for snapshot in series.ticks() {
        let outcome = step(
            &mut ledger,
            snapshot,
            take_profit,
            stop_loss,
            config.conflict_policy,
        );
        actions.extend(outcome.appended);
        warnings.extend(outcome.warnings);
    }

    let report = ProfitReport::compute(config.initial_money, &ledger);
    info!(
        actions = actions.len(),
        warnings = warnings.len(),
        profit = report.profit,
        "backtest finished"
    );

    BacktestResult {
        ledger,
        actions,
        warnings,
        ticks_processed: series.len(),
        report,
    }
}
