//! Price data port trait.

use crate::domain::error::CrosstraderError;
use crate::domain::price::PriceBar;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Daily closes for `ticker` in `[start_date, end_date)`, ascending.
    ///
    /// Implementations return [`CrosstraderError::NoData`] for an empty
    /// result and [`CrosstraderError::InsufficientData`] below
    /// [`crate::domain::price::MIN_PRICE_BARS`].
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, CrosstraderError>;
}
