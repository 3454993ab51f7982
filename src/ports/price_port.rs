//! Price data port trait.

use crate::domain::error::TpslError;
use crate::domain::price::PriceFeed;
use chrono::NaiveDate;

pub trait PricePort {
    /// Time-ordered snapshots covering `symbols` between `start_date` and
    /// `end_date` inclusive. Unusable cells and rows come back as warnings;
    /// only an unreadable source is an error.
    fn fetch_series(
        &self,
        symbols: &[String],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<PriceFeed, TpslError>;
}
