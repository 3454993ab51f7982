//! Flat CSV ledger file adapter.
//!
//! Header: `symbol,time,transaction price,transaction direction,volume,latest position`.
//! Files written with a leading unnamed index column are also accepted.

use crate::domain::error::TpslError;
use crate::domain::ledger::Ledger;
use crate::domain::transaction::{
    normalize_symbol, parse_timestamp, Direction, Transaction, TIME_FORMAT,
};
use crate::ports::ledger_port::LedgerPort;
use std::path::{Path, PathBuf};

pub const LEDGER_HEADER: [&str; 6] = [
    "symbol",
    "time",
    "transaction price",
    "transaction direction",
    "volume",
    "latest position",
];

pub struct CsvLedgerAdapter {
    path: PathBuf,
}

impl CsvLedgerAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn format_error(&self, reason: String) -> TpslError {
        TpslError::LedgerFormat {
            path: self.path.display().to_string(),
            reason,
        }
    }

    /// Column offset: 0 for the plain header, 1 when an index column leads.
    fn header_offset(&self, headers: &csv::StringRecord) -> Result<usize, TpslError> {
        let names: Vec<&str> = headers.iter().map(str::trim).collect();
        if names == LEDGER_HEADER {
            return Ok(0);
        }
        if names.len() == LEDGER_HEADER.len() + 1 && names[0].is_empty() && names[1..] == LEDGER_HEADER
        {
            return Ok(1);
        }
        Err(self.format_error(format!(
            "unexpected header '{}', expected '{}'",
            names.join(","),
            LEDGER_HEADER.join(",")
        )))
    }

    fn parse_number(&self, record: &csv::StringRecord, col: usize, line: u64) -> Result<f64, TpslError> {
        let raw = record
            .get(col)
            .ok_or_else(|| self.format_error(format!("line {}: missing column {}", line, col)))?;
        raw.trim().parse().map_err(|e| {
            self.format_error(format!("line {}: invalid number '{}': {}", line, raw, e))
        })
    }

    fn parse_record(
        &self,
        record: &csv::StringRecord,
        offset: usize,
        line: u64,
    ) -> Result<Transaction, TpslError> {
        let symbol = record
            .get(offset)
            .map(normalize_symbol)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| self.format_error(format!("line {}: missing symbol", line)))?;

        let time_str = record
            .get(offset + 1)
            .ok_or_else(|| self.format_error(format!("line {}: missing time", line)))?;
        let time = parse_timestamp(time_str).ok_or_else(|| {
            self.format_error(format!("line {}: invalid time '{}'", line, time_str))
        })?;

        let price = self.parse_number(record, offset + 2, line)?;
        let direction_raw = self.parse_number(record, offset + 3, line)?;
        let direction = Direction::from_number(direction_raw).ok_or_else(|| {
            self.format_error(format!(
                "line {}: transaction direction must be -1, 0 or 1, got {}",
                line, direction_raw
            ))
        })?;
        let volume = self.parse_number(record, offset + 4, line)?;
        let latest_position = self.parse_number(record, offset + 5, line)?;

        Ok(Transaction {
            symbol,
            time,
            transaction_price: price,
            transaction_direction: direction,
            volume,
            latest_position,
        })
    }
}

impl LedgerPort for CsvLedgerAdapter {
    fn load(&self) -> Result<Ledger, TpslError> {
        let mut rdr = csv::Reader::from_path(&self.path)
            .map_err(|e| self.format_error(format!("failed to open: {}", e)))?;

        let headers = rdr
            .headers()
            .map_err(|e| self.format_error(format!("failed to read header: {}", e)))?
            .clone();
        let offset = self.header_offset(&headers)?;

        let mut ledger = Ledger::new();
        for result in rdr.records() {
            let record = result.map_err(|e| self.format_error(format!("CSV parse error: {}", e)))?;
            let line = record.position().map_or(0, |p| p.line());
            ledger.push(self.parse_record(&record, offset, line)?);
        }

        ledger.check_consistency()?;
        Ok(ledger)
    }

    fn save(&self, ledger: &Ledger) -> Result<(), TpslError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut wtr = csv::Writer::from_path(&self.path)
            .map_err(|e| self.format_error(format!("failed to create: {}", e)))?;
        wtr.write_record(LEDGER_HEADER)
            .map_err(|e| self.format_error(e.to_string()))?;

        for tx in ledger {
            wtr.write_record([
                tx.symbol.clone(),
                tx.time.format(TIME_FORMAT).to_string(),
                tx.transaction_price.to_string(),
                tx.transaction_direction.to_string(),
                tx.volume.to_string(),
                tx.latest_position.to_string(),
            ])
            .map_err(|e| self.format_error(e.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
