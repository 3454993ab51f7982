//! Domain error types.

/// A problem with a single ledger row, reported with its zero-based index.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("row {row} ({symbol}): latest position {found} does not match running total {expected}")]
    PositionMismatch {
        row: usize,
        symbol: String,
        expected: f64,
        found: f64,
    },

    #[error("row {row} ({symbol}): volume must be non-negative, got {volume}")]
    NegativeVolume {
        row: usize,
        symbol: String,
        volume: f64,
    },

    #[error("row {row} ({symbol}): time {current} is before the previous row at {previous}")]
    OutOfOrder {
        row: usize,
        symbol: String,
        previous: chrono::NaiveDateTime,
        current: chrono::NaiveDateTime,
    },

    #[error("row {row} ({symbol}): transaction price must be positive, got {price}")]
    NonPositivePrice {
        row: usize,
        symbol: String,
        price: f64,
    },
}

/// Rejected price series construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeriesError {
    #[error("snapshot at {current} is not after previous snapshot at {previous}")]
    OutOfOrder {
        previous: chrono::NaiveDateTime,
        current: chrono::NaiveDateTime,
    },
}

/// Top-level error type for tpsl.
#[derive(Debug, thiserror::Error)]
pub enum TpslError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("ledger file {path}: {reason}")]
    LedgerFormat { path: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("price data {path}: {reason}")]
    PriceData { path: String, reason: String },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("no price data for {symbols} between {start} and {end}")]
    NoData {
        symbols: String,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TpslError {
    /// Process exit status for this error class.
    pub fn exit_status(&self) -> u8 {
        match self {
            TpslError::Io(_) => 1,
            TpslError::ConfigParse { .. }
            | TpslError::ConfigMissing { .. }
            | TpslError::ConfigInvalid { .. } => 2,
            TpslError::LedgerFormat { .. } | TpslError::Ledger(_) => 3,
            TpslError::PriceData { .. } | TpslError::Series(_) | TpslError::NoData { .. } => 5,
        }
    }
}

impl From<&TpslError> for std::process::ExitCode {
    fn from(err: &TpslError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
