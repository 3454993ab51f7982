//! Ledger rows and trade direction.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// Format used when writing timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_FORMATS: [&str; 4] = [
    TIME_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a timestamp written with or without a time part. A bare date means
/// midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Canonical form of a ticker: trimmed and upper-cased. Every file and config
/// boundary passes symbols through this before they reach the domain.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Side of an executed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Sell,
    Flat,
    Buy,
}

impl Direction {
    /// Direction matching the sign of `value`. Zero and NaN map to `Flat`.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Direction::Buy
        } else if value < 0.0 {
            Direction::Sell
        } else {
            Direction::Flat
        }
    }

    /// Parse the numeric ledger encoding (`-1`, `0`, `1`, also `-1.0` etc.).
    pub fn from_number(value: f64) -> Option<Self> {
        if value == -1.0 {
            Some(Direction::Sell)
        } else if value == 0.0 {
            Some(Direction::Flat)
        } else if value == 1.0 {
            Some(Direction::Buy)
        } else {
            None
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Direction::Sell => -1,
            Direction::Flat => 0,
            Direction::Buy => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Sell => Direction::Buy,
            Direction::Flat => Direction::Flat,
            Direction::Buy => Direction::Sell,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// One executed transaction in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub symbol: String,
    pub time: NaiveDateTime,
    pub transaction_price: f64,
    pub transaction_direction: Direction,
    pub volume: f64,
    /// Running signed position for `symbol` after this transaction.
    pub latest_position: f64,
}

impl Transaction {
    /// direction × volume
    pub fn signed_volume(&self) -> f64 {
        self.transaction_direction.as_f64() * self.volume
    }

    /// Cash flow of the transaction: buying spends, selling receives.
    pub fn cash_flow(&self) -> f64 {
        -self.transaction_price * self.signed_volume()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_buy() -> Transaction {
        Transaction {
            symbol: "AAPL".into(),
            time: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            transaction_price: 100.0,
            transaction_direction: Direction::Buy,
            volume: 10.0,
            latest_position: 10.0,
        }
    }

    #[test]
    fn normalize_symbol_trims_and_uppercases() {
        assert_eq!(normalize_symbol(" aapl "), "AAPL");
        assert_eq!(normalize_symbol("Brk.b"), "BRK.B");
    }

    #[test]
    fn parse_timestamp_variants() {
        let noon = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(noon));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(noon));
        assert_eq!(parse_timestamp(" 2024-03-01 12:30 "), Some(noon));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("03/01/2024"), None);
    }

    #[test]
    fn from_sign() {
        assert_eq!(Direction::from_sign(3.5), Direction::Buy);
        assert_eq!(Direction::from_sign(-0.1), Direction::Sell);
        assert_eq!(Direction::from_sign(0.0), Direction::Flat);
        assert_eq!(Direction::from_sign(f64::NAN), Direction::Flat);
    }

    #[test]
    fn from_number_accepts_float_encodings() {
        assert_eq!(Direction::from_number(-1.0), Some(Direction::Sell));
        assert_eq!(Direction::from_number(1.0), Some(Direction::Buy));
        assert_eq!(Direction::from_number(0.0), Some(Direction::Flat));
        assert_eq!(Direction::from_number(2.0), None);
        assert_eq!(Direction::from_number(0.5), None);
    }

    #[test]
    fn opposite() {
        assert_eq!(Direction::Buy.opposite(), Direction::Sell);
        assert_eq!(Direction::Sell.opposite(), Direction::Buy);
        assert_eq!(Direction::Flat.opposite(), Direction::Flat);
    }

    #[test]
    fn display_uses_numeric_encoding() {
        assert_eq!(Direction::Sell.to_string(), "-1");
        assert_eq!(Direction::Buy.to_string(), "1");
    }

    #[test]
    fn buy_spends_cash() {
        let tx = sample_buy();
        assert!((tx.signed_volume() - 10.0).abs() < f64::EPSILON);
        assert!((tx.cash_flow() - (-1000.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn sell_receives_cash() {
        let tx = Transaction {
            transaction_direction: Direction::Sell,
            transaction_price: 131.0,
            latest_position: 0.0,
            ..sample_buy()
        };
        assert!((tx.cash_flow() - 1310.0).abs() < f64::EPSILON);
    }
}
