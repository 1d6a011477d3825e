//! Static buy-and-hold benchmark.
//!
//! Buys floor(capital / first_close) shares on the first aligned bar and
//! holds them to the end. No rebalancing, fees or dividends.

use chrono::NaiveDate;

use super::error::CrosstraderError;
use super::price::PriceBar;

#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkRecord {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Benchmark {
    pub shares: u64,
    pub records: Vec<BenchmarkRecord>,
}

impl Benchmark {
    pub fn equity(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.value).collect()
    }
}

/// Align `prices` to `index` (the strategy's dates) and value a fixed
/// share count over it. `prices` must be sorted by date.
pub fn buy_and_hold(
    prices: &[PriceBar],
    index: &[NaiveDate],
    initial_capital: f64,
) -> Result<Benchmark, CrosstraderError> {
    let aligned = index
        .iter()
        .map(|date| {
            prices
                .binary_search_by_key(date, |bar| bar.date)
                .map(|pos| prices[pos])
                .map_err(|_| CrosstraderError::BenchmarkDateMissing { date: *date })
        })
        .collect::<Result<Vec<PriceBar>, _>>()?;

    let first_price = aligned
        .first()
        .map(|bar| bar.close)
        .ok_or(CrosstraderError::EmptyBenchmarkIndex)?;
    if !first_price.is_finite() || first_price <= 0.0 {
        return Err(CrosstraderError::InvalidBenchmarkPrice { price: first_price });
    }

    let shares = (initial_capital / first_price).floor();
    if shares.is_nan() || shares < 1.0 {
        return Err(CrosstraderError::CapitalTooSmall {
            capital: initial_capital,
            price: first_price,
        });
    }
    let shares = shares as u64;

    let records = aligned
        .iter()
        .map(|bar| BenchmarkRecord {
            date: bar.date,
            value: shares as f64 * bar.close,
        })
        .collect();

    Ok(Benchmark { shares, records })
}
