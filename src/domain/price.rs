//! Price snapshots and time-ordered price series.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashSet};

use super::error::SeriesError;
use super::warning::TickWarning;

/// One tick: symbol → current price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub time: NaiveDateTime,
    pub prices: BTreeMap<String, f64>,
}

impl PriceSnapshot {
    pub fn new(time: NaiveDateTime) -> Self {
        Self {
            time,
            prices: BTreeMap::new(),
        }
    }

    pub fn with_price(mut self, symbol: &str, price: f64) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

/// Finite sequence of snapshots with strictly increasing times.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    ticks: Vec<PriceSnapshot>,
}

impl PriceSeries {
    pub fn new(ticks: Vec<PriceSnapshot>) -> Result<Self, SeriesError> {
        for pair in ticks.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(SeriesError::OutOfOrder {
                    previous: pair[0].time,
                    current: pair[1].time,
                });
            }
        }
        Ok(Self { ticks })
    }

    pub fn ticks(&self) -> &[PriceSnapshot] {
        &self.ticks
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn first(&self) -> Option<&PriceSnapshot> {
        self.ticks.first()
    }

    pub fn last(&self) -> Option<&PriceSnapshot> {
        self.ticks.last()
    }

    /// Ticks whose date falls within `[start, end]` inclusive.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let ticks = self
            .ticks
            .iter()
            .filter(|t| {
                let d = t.time.date();
                d >= start && d <= end
            })
            .cloned()
            .collect();
        Self { ticks }
    }

    /// Keep only prices for `symbols`. Ticks left without any price are dropped.
    pub fn restrict(&self, symbols: &[String]) -> Self {
        let wanted: HashSet<&str> = symbols.iter().map(String::as_str).collect();
        let ticks = self
            .ticks
            .iter()
            .filter_map(|t| {
                let prices: BTreeMap<String, f64> = t
                    .prices
                    .iter()
                    .filter(|(s, _)| wanted.contains(s.as_str()))
                    .map(|(s, p)| (s.clone(), *p))
                    .collect();
                if prices.is_empty() {
                    None
                } else {
                    Some(PriceSnapshot {
                        time: t.time,
                        prices,
                    })
                }
            })
            .collect();
        Self { ticks }
    }
}

/// What a price source hands back: the usable series plus any rows or cells it
/// had to drop on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFeed {
    pub series: PriceSeries,
    pub warnings: Vec<TickWarning>,
}

impl PriceFeed {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series,
            warnings: Vec::new(),
        }
    }

    /// Narrow both the series and the warnings to `[start, end]` and
    /// `symbols`. Warnings without a time or symbol are always kept.
    pub fn select(self, symbols: &[String], start: NaiveDate, end: NaiveDate) -> Self {
        let series = self.series.window(start, end).restrict(symbols);
        let warnings = self
            .warnings
            .into_iter()
            .filter(|w| w.time.is_none_or(|t| t.date() >= start && t.date() <= end))
            .filter(|w| {
                w.symbol
                    .as_deref()
                    .is_none_or(|s| symbols.iter().any(|wanted| wanted == s))
            })
            .collect();
        Self { series, warnings }
    }
}
