//! Wide CSV price file adapter.
//!
//! One row per tick: `time,SYM1,SYM2,...`. An empty cell means the symbol has
//! no price on that tick.

use crate::domain::backtest::Interval;
use crate::domain::error::TpslError;
use crate::domain::price::{PriceFeed, PriceSeries, PriceSnapshot};
use crate::domain::transaction::{normalize_symbol, parse_timestamp};
use crate::domain::warning::{TickWarning, WarningKind};
use crate::ports::price_port::PricePort;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    path: PathBuf,
    interval: Interval,
}

impl CsvPriceAdapter {
    pub fn new(path: PathBuf, interval: Interval) -> Self {
        Self { path, interval }
    }

    fn data_error(&self, reason: String) -> TpslError {
        TpslError::PriceData {
            path: self.path.display().to_string(),
            reason,
        }
    }

    /// Align a tick time to the sampling interval.
    fn align(&self, time: NaiveDateTime) -> NaiveDateTime {
        match self.interval {
            Interval::Days => time.date().and_hms_opt(0, 0, 0).unwrap_or(time),
            Interval::Minutes => time
                .with_second(0)
                .and_then(|t| t.with_nanosecond(0))
                .unwrap_or(time),
        }
    }

    /// Read every row. A missing file or unusable header is an error; a bad
    /// time, a bad cell or a second row for the same aligned time is dropped
    /// with a warning.
    fn read_feed(&self) -> Result<PriceFeed, TpslError> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| self.data_error(format!("failed to open: {}", e)))?;

        let headers = rdr
            .headers()
            .map_err(|e| self.data_error(format!("failed to read header: {}", e)))?
            .clone();
        if headers.len() < 2 {
            return Err(self.data_error("expected a time column and at least one symbol".into()));
        }
        let symbols: Vec<String> = headers.iter().skip(1).map(normalize_symbol).collect();

        let mut rows: Vec<(u64, PriceSnapshot)> = Vec::new();
        let mut warnings = Vec::new();
        for result in rdr.records() {
            let record = match result {
                Ok(record) => record,
                Err(e) => match e.kind() {
                    csv::ErrorKind::Utf8 { pos, .. } => {
                        warnings.push(TickWarning::for_tick(
                            None,
                            WarningKind::MalformedTick {
                                line: pos.as_ref().map_or(0, |p| p.line()),
                                reason: "invalid UTF-8".into(),
                            },
                        ));
                        continue;
                    }
                    _ => return Err(self.data_error(format!("CSV parse error: {}", e))),
                },
            };
            let line = record.position().map_or(0, |p| p.line());

            let time_str = record.get(0).unwrap_or_default().trim();
            let Some(time) = parse_timestamp(time_str) else {
                warnings.push(TickWarning::for_tick(
                    None,
                    WarningKind::MalformedTick {
                        line,
                        reason: format!("invalid time '{}'", time_str),
                    },
                ));
                continue;
            };
            let time = self.align(time);

            let mut snapshot = PriceSnapshot::new(time);
            for (symbol, cell) in symbols.iter().zip(record.iter().skip(1)) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                match cell.parse::<f64>() {
                    Ok(price) => {
                        snapshot.prices.insert(symbol.clone(), price);
                    }
                    Err(_) => warnings.push(TickWarning::for_symbol(
                        time,
                        symbol,
                        WarningKind::MalformedPrice {
                            line,
                            cell: cell.to_string(),
                        },
                    )),
                }
            }
            rows.push((line, snapshot));
        }

        // stable: the first row in file order wins a duplicate time
        rows.sort_by_key(|(_, t)| t.time);
        let mut ticks: Vec<PriceSnapshot> = Vec::with_capacity(rows.len());
        for (line, tick) in rows {
            if ticks.last().is_some_and(|prev| prev.time == tick.time) {
                warnings.push(TickWarning::for_tick(
                    Some(tick.time),
                    WarningKind::MalformedTick {
                        line,
                        reason: format!("duplicate {} tick", self.interval),
                    },
                ));
                continue;
            }
            ticks.push(tick);
        }

        Ok(PriceFeed {
            series: PriceSeries::new(ticks)?,
            warnings,
        })
    }
}

impl PricePort for CsvPriceAdapter {
    fn fetch_series(
        &self,
        symbols: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceFeed, TpslError> {
        Ok(self.read_feed()?.select(symbols, start_date, end_date))
    }
}
