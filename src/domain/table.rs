//! Column-oriented views of run outputs.
//!
//! Exported tables map column name → ordered values, with dates rendered
//! as ISO-8601 strings and undefined values as `null`. A signals table can
//! be read back as a [`ColumnMap`] and replayed through the simulator.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CrosstraderError;
use super::portfolio::{PortfolioRecord, TradeBar};
use super::signal::SignalRecord;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Columns the simulator cannot run without.
pub const REQUIRED_SIGNAL_COLUMNS: [&str; 4] = ["Date", "Close", "Signal", "Position"];

pub type ColumnMap = BTreeMap<String, Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioColumns {
    #[serde(rename = "Date")]
    pub date: Vec<String>,
    #[serde(rename = "Cash")]
    pub cash: Vec<f64>,
    #[serde(rename = "Holdings")]
    pub holdings: Vec<f64>,
    #[serde(rename = "Total")]
    pub total: Vec<f64>,
}

impl From<&[PortfolioRecord]> for PortfolioColumns {
    fn from(records: &[PortfolioRecord]) -> Self {
        PortfolioColumns {
            date: records.iter().map(|r| format_date(r.date)).collect(),
            cash: records.iter().map(|r| r.cash).collect(),
            holdings: records.iter().map(|r| r.holdings).collect(),
            total: records.iter().map(|r| r.total).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalColumns {
    #[serde(rename = "Date")]
    pub date: Vec<String>,
    #[serde(rename = "Close")]
    pub close: Vec<f64>,
    #[serde(rename = "Short_MA")]
    pub short_ma: Vec<f64>,
    #[serde(rename = "Long_MA")]
    pub long_ma: Vec<f64>,
    #[serde(rename = "Signal")]
    pub signal: Vec<u8>,
    #[serde(rename = "Position")]
    pub position: Vec<i8>,
    #[serde(rename = "Return")]
    pub ret: Vec<Option<f64>>,
    #[serde(rename = "Next_Return")]
    pub next_return: Vec<Option<f64>>,
    #[serde(rename = "Target")]
    pub target: Vec<Option<u8>>,
    #[serde(rename = "Ret_1")]
    pub ret_1: Vec<Option<f64>>,
    #[serde(rename = "Ret_3")]
    pub ret_3: Vec<Option<f64>>,
    #[serde(rename = "Ret_5")]
    pub ret_5: Vec<Option<f64>>,
    #[serde(rename = "ML_Signal")]
    pub ml_signal: Vec<u8>,
    #[serde(rename = "ML_Confidence")]
    pub ml_confidence: Vec<f64>,
}

impl From<&[SignalRecord]> for SignalColumns {
    fn from(records: &[SignalRecord]) -> Self {
        SignalColumns {
            date: records.iter().map(|r| format_date(r.date)).collect(),
            close: records.iter().map(|r| r.close).collect(),
            short_ma: records.iter().map(|r| r.short_ma).collect(),
            long_ma: records.iter().map(|r| r.long_ma).collect(),
            signal: records.iter().map(|r| r.signal).collect(),
            position: records.iter().map(|r| r.position).collect(),
            ret: records.iter().map(|r| r.ret).collect(),
            next_return: records.iter().map(|r| r.next_return).collect(),
            target: records.iter().map(|r| r.target).collect(),
            ret_1: records.iter().map(|r| r.ret_1).collect(),
            ret_3: records.iter().map(|r| r.ret_3).collect(),
            ret_5: records.iter().map(|r| r.ret_5).collect(),
            ml_signal: records.iter().map(|r| r.ml_signal).collect(),
            ml_confidence: records.iter().map(|r| r.ml_confidence).collect(),
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Rebuild simulator input from a signals column map.
///
/// Fails if any of [`REQUIRED_SIGNAL_COLUMNS`] is absent. Rows with a null
/// Close, Signal or Position are dropped; the rest must hold a parseable
/// date, a numeric close, Signal in {0, 1} and Position in {-1, 0, 1}, in
/// ascending date order.
pub fn trade_bars_from_columns(columns: &ColumnMap) -> Result<Vec<TradeBar>, CrosstraderError> {
    let missing: Vec<&str> = REQUIRED_SIGNAL_COLUMNS
        .iter()
        .copied()
        .filter(|name| !columns.contains_key(*name))
        .collect();
    if !missing.is_empty() {
        return Err(CrosstraderError::MissingColumns {
            columns: missing.join(", "),
        });
    }

    let dates = &columns["Date"];
    let closes = &columns["Close"];
    let signals = &columns["Signal"];
    let positions = &columns["Position"];

    for name in REQUIRED_SIGNAL_COLUMNS {
        if columns[name].len() != dates.len() {
            return Err(invalid(
                name,
                columns[name].len().min(dates.len()),
                "column length differs from Date",
            ));
        }
    }

    let mut bars: Vec<TradeBar> = Vec::with_capacity(dates.len());
    for row in 0..dates.len() {
        if closes[row].is_null() || signals[row].is_null() || positions[row].is_null() {
            continue;
        }

        let date = parse_date_cell(&dates[row], row)?;
        let close = numeric_cell(&closes[row], "Close", row)?;
        let signal = numeric_cell(&signals[row], "Signal", row)?;
        if signal != 0.0 && signal != 1.0 {
            return Err(invalid("Signal", row, "expected 0 or 1"));
        }
        let position = match numeric_cell(&positions[row], "Position", row)? {
            v if v == 1.0 => 1,
            v if v == -1.0 => -1,
            v if v == 0.0 => 0,
            _ => return Err(invalid("Position", row, "expected -1, 0 or 1")),
        };

        if let Some(prev) = bars.last() {
            if prev.date >= date {
                return Err(invalid("Date", row, "dates must be strictly ascending"));
            }
        }

        bars.push(TradeBar {
            date,
            close,
            position,
        });
    }

    Ok(bars)
}

fn invalid(column: &str, row: usize, reason: &str) -> CrosstraderError {
    CrosstraderError::InvalidColumnValue {
        column: column.to_string(),
        row,
        reason: reason.to_string(),
    }
}

fn numeric_cell(value: &Value, column: &str, row: usize) -> Result<f64, CrosstraderError> {
    value
        .as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid(column, row, "expected a number"))
}

/// Accepts `YYYY-MM-DD` and timestamp strings that start with it.
fn parse_date_cell(value: &Value, row: usize) -> Result<NaiveDate, CrosstraderError> {
    value
        .as_str()
        .and_then(|s| s.get(..10))
        .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
        .ok_or_else(|| invalid("Date", row, "expected YYYY-MM-DD"))
}
