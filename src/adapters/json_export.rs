//! JSON results document.
//!
//! ```json
//! {
//!     "portfolio": { "Date": [...], "Cash": [...], "Holdings": [...], "Total": [...] },
//!     "signals":   { "Date": [...], "Close": [...], ..., "ML_Confidence": [...] }
//! }
//! ```

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrosstraderError;
use crate::domain::table::{ColumnMap, PortfolioColumns, SignalColumns};
use crate::ports::result_port::ResultSink;
use log::info;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsDocument {
    pub portfolio: PortfolioColumns,
    pub signals: SignalColumns,
}

impl From<&BacktestResult> for ResultsDocument {
    fn from(result: &BacktestResult) -> Self {
        ResultsDocument {
            portfolio: PortfolioColumns::from(result.simulation.records.as_slice()),
            signals: SignalColumns::from(result.signals.as_slice()),
        }
    }
}

/// Pretty-printed with four-space indentation.
pub fn to_json_string<T: Serialize>(value: &T) -> Result<String, CrosstraderError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| CrosstraderError::Serialization {
        reason: e.to_string(),
    })
}

pub struct JsonExporter {
    path: PathBuf,
}

impl JsonExporter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ResultSink for JsonExporter {
    fn write(&self, result: &BacktestResult) -> Result<(), CrosstraderError> {
        let text = to_json_string(&ResultsDocument::from(result))?;
        fs::write(&self.path, text)?;
        info!("results written to {}", self.path.display());
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// Read a signals column map from either a full results document or a
/// bare `{column: [values]}` object.
pub fn read_signal_columns(path: &Path) -> Result<ColumnMap, CrosstraderError> {
    let text = fs::read_to_string(path)?;
    parse_signal_columns(&text)
}

pub fn parse_signal_columns(text: &str) -> Result<ColumnMap, CrosstraderError> {
    let mut value: Value = serde_json::from_str(text)?;
    let table = match value.get_mut("signals") {
        Some(signals) if signals.is_object() => signals.take(),
        _ => value,
    };
    Ok(serde_json::from_value(table)?)
}
