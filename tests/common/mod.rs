#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tpsl::domain::applier::ConflictPolicy;
use tpsl::domain::backtest::{BacktestConfig, Interval};
use tpsl::domain::error::TpslError;
use tpsl::domain::ledger::Ledger;
use tpsl::domain::price::{PriceFeed, PriceSeries, PriceSnapshot};
use tpsl::domain::warning::TickWarning;
use tpsl::domain::rules::Thresholds;
use tpsl::domain::transaction::Direction;
use tpsl::ports::ledger_port::LedgerPort;
use tpsl::ports::price_port::PricePort;

pub struct MockPricePort {
    pub ticks: Vec<PriceSnapshot>,
    pub warnings: Vec<TickWarning>,
    pub error: Option<String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            ticks: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn with_warning(mut self, warning: TickWarning) -> Self {
        self.warnings.push(warning);
        self
    }

    pub fn with_tick(mut self, date: &str, prices: &[(&str, f64)]) -> Self {
        self.ticks.push(snapshot(date, prices));
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn fetch_series(
        &self,
        symbols: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceFeed, TpslError> {
        if let Some(reason) = &self.error {
            return Err(TpslError::PriceData {
                path: "mock".into(),
                reason: reason.clone(),
            });
        }
        let feed = PriceFeed {
            series: PriceSeries::new(self.ticks.clone())?,
            warnings: self.warnings.clone(),
        };
        Ok(feed.select(symbols, start_date, end_date))
    }
}

/// In-memory ledger store that counts saves.
pub struct MemoryLedgerPort {
    pub ledger: RefCell<Ledger>,
    pub saves: RefCell<usize>,
}

impl MemoryLedgerPort {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger: RefCell::new(ledger),
            saves: RefCell::new(0),
        }
    }
}

impl LedgerPort for MemoryLedgerPort {
    fn load(&self) -> Result<Ledger, TpslError> {
        Ok(self.ledger.borrow().clone())
    }

    fn save(&self, ledger: &Ledger) -> Result<(), TpslError> {
        *self.ledger.borrow_mut() = ledger.clone();
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(date: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn snapshot(date: &str, prices: &[(&str, f64)]) -> PriceSnapshot {
    PriceSnapshot {
        time: at(date),
        prices: prices
            .iter()
            .map(|(s, p)| (s.to_string(), *p))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn symbols(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// AAPL bought 10 @ 100 on 2024-01-02.
pub fn long_aapl() -> Ledger {
    let mut ledger = Ledger::new();
    ledger.record("AAPL", at("2024-01-02"), 100.0, Direction::Buy, 10.0);
    ledger
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        initial_money: 10_000.0,
        start_date: date(2024, 1, 1),
        end_date: date(2024, 12, 31),
        symbols: symbols(&["AAPL", "MSFT"]),
        interval: Interval::Days,
        conflict_policy: ConflictPolicy::TakeProfitFirst,
        take_profit: Thresholds::default(),
        stop_loss: Thresholds::default(),
    }
}
