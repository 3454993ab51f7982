//! Data-quality warnings raised while reading prices or replaying ticks.
//!
//! None of these stop a run: the offending cell, row or tick is dropped and
//! the warning is carried out with the result.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum WarningKind {
    /// An open position has no price on this tick.
    MissingPrice,
    /// Price is zero, negative, or not a number.
    InvalidPrice(f64),
    /// A price cell that does not parse. Only that cell is dropped.
    MalformedPrice { line: u64, cell: String },
    /// A source row that cannot be placed on the timeline. The row is dropped.
    MalformedTick { line: u64, reason: String },
    /// Tick earlier than the newest ledger row.
    StaleTick { latest: NaiveDateTime },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingPrice => f.write_str("missing price for open position"),
            WarningKind::InvalidPrice(p) => write!(f, "invalid price {p}"),
            WarningKind::MalformedPrice { line, cell } => {
                write!(f, "line {line}: unparseable price '{cell}'")
            }
            WarningKind::MalformedTick { line, reason } => write!(f, "line {line}: {reason}"),
            WarningKind::StaleTick { latest } => {
                write!(f, "tick precedes latest ledger row at {latest}")
            }
        }
    }
}

/// One skipped cell, symbol or tick. `time` is absent when the row's time
/// itself could not be read; `symbol` is absent for whole-tick problems.
#[derive(Debug, Clone, PartialEq)]
pub struct TickWarning {
    pub time: Option<NaiveDateTime>,
    pub symbol: Option<String>,
    pub kind: WarningKind,
}

impl TickWarning {
    pub fn for_symbol(time: NaiveDateTime, symbol: &str, kind: WarningKind) -> Self {
        Self {
            time: Some(time),
            symbol: Some(symbol.to_string()),
            kind,
        }
    }

    pub fn for_tick(time: Option<NaiveDateTime>, kind: WarningKind) -> Self {
        Self {
            time,
            symbol: None,
            kind,
        }
    }
}

impl fmt::Display for TickWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(time) = self.time {
            write!(f, "{time} ")?;
        }
        if let Some(symbol) = &self.symbol {
            write!(f, "{symbol}: ")?;
        }
        write!(f, "{}", self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn display_includes_known_context() {
        let w = TickWarning::for_symbol(noon(), "AAPL", WarningKind::MissingPrice);
        assert_eq!(w.to_string(), "2024-01-02 12:00:00 AAPL: missing price for open position");

        let w = TickWarning::for_tick(
            None,
            WarningKind::MalformedTick {
                line: 4,
                reason: "invalid time 'x'".into(),
            },
        );
        assert_eq!(w.to_string(), "line 4: invalid time 'x'");
    }
}
