//! CSV file price data adapter.
//!
//! One file per ticker, `<base_path>/<TICKER>.csv`, with a header row.
//! Only the `date` and `close` columns are read; any others are ignored.

use crate::domain::error::CrosstraderError;
use crate::domain::price::{validate_price_series, PriceBar};
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn malformed(reason: impl Into<String>) -> CrosstraderError {
    CrosstraderError::MalformedData {
        reason: reason.into(),
    }
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}

/// Accepts `YYYY-MM-DD` and timestamps that start with it.
fn parse_date(raw: &str) -> Result<NaiveDate, CrosstraderError> {
    let raw = raw.trim();
    raw.get(..10)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .ok_or_else(|| malformed(format!("invalid date '{}'", raw)))
}

impl PriceDataPort for CsvPriceAdapter {
    fn fetch_closes(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, CrosstraderError> {
        let path = self.csv_path(ticker);
        debug!("reading prices from {}", path.display());
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(CrosstraderError::NoData {
                    ticker: ticker.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| malformed(format!("CSV header error: {}", e)))?
            .clone();
        let date_col =
            column_index(&headers, "date").ok_or_else(|| malformed("missing date column"))?;
        let close_col = column_index(&headers, "close")
            .ok_or_else(|| malformed("downloaded data does not contain closing prices"))?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| malformed(format!("CSV parse error: {}", e)))?;

            let date = parse_date(record.get(date_col).unwrap_or_default())?;
            if date < start_date || date >= end_date {
                continue;
            }

            let close_str = record.get(close_col).unwrap_or_default().trim();
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str
                .parse()
                .map_err(|e| malformed(format!("invalid close value '{}': {}", close_str, e)))?;

            bars.push(PriceBar::new(date, close));
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(malformed(format!("duplicate date {}", pair[0].date)));
        }

        validate_price_series(ticker, &bars)?;
        Ok(bars)
    }
}
