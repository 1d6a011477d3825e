//! Daily close price representation.

use chrono::NaiveDate;

use super::error::CrosstraderError;

/// Minimum number of daily closes a data source must supply for a run.
pub const MIN_PRICE_BARS: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        PriceBar { date, close }
    }
}

/// Check the guarantees every data source owes the core: strictly
/// ascending dates, finite positive closes and at least [`MIN_PRICE_BARS`]
/// observations.
pub fn validate_price_series(ticker: &str, bars: &[PriceBar]) -> Result<(), CrosstraderError> {
    if bars.is_empty() {
        return Err(CrosstraderError::NoData {
            ticker: ticker.to_string(),
        });
    }

    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(CrosstraderError::MalformedData {
                reason: format!("non-positive close {} on {}", bar.close, bar.date),
            });
        }
        if i > 0 && bars[i - 1].date >= bar.date {
            return Err(CrosstraderError::MalformedData {
                reason: format!(
                    "dates not strictly ascending at {} (previous {})",
                    bar.date,
                    bars[i - 1].date
                ),
            });
        }
    }

    if bars.len() < MIN_PRICE_BARS {
        return Err(CrosstraderError::InsufficientData {
            ticker: ticker.to_string(),
            bars: bars.len(),
            minimum: MIN_PRICE_BARS,
        });
    }

    Ok(())
}
