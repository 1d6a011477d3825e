//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for crosstrader.
#[derive(Debug, thiserror::Error)]
pub enum CrosstraderError {
    #[error("invalid {field}: {reason}")]
    InputValidation { field: String, reason: String },

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

    #[error("no data returned for ticker '{ticker}'")]
    NoData { ticker: String },

    #[error("insufficient data for {ticker}: have {bars} bars, need {minimum}")]
    InsufficientData {
        ticker: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed price data: {reason}")]
    MalformedData { reason: String },

    #[error("signal frame is missing required columns: {columns}")]
    MissingColumns { columns: String },

    #[error("invalid value in column {column} at row {row}: {reason}")]
    InvalidColumnValue {
        column: String,
        row: usize,
        reason: String,
    },

    #[error("invalid {name}: {value} (must be a positive integer)")]
    InvalidWindow { name: String, value: usize },

    #[error("benchmark index is empty")]
    EmptyBenchmarkIndex,

    #[error("benchmark date {date} not present in price series")]
    BenchmarkDateMissing { date: NaiveDate },

    #[error("invalid first price for benchmark: {price}")]
    InvalidBenchmarkPrice { price: f64 },

    #[error("initial capital ${capital} is too small to buy 1 share at ${price}")]
    CapitalTooSmall { capital: f64, price: f64 },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CrosstraderError {
    pub fn input(field: &str, reason: impl Into<String>) -> Self {
        CrosstraderError::InputValidation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for CrosstraderError {
    fn from(err: serde_json::Error) -> Self {
        CrosstraderError::Serialization {
            reason: err.to_string(),
        }
    }
}

impl From<&CrosstraderError> for std::process::ExitCode {
    fn from(err: &CrosstraderError) -> Self {
        let code: u8 = match err {
            CrosstraderError::Io(_) | CrosstraderError::Serialization { .. } => 1,
            CrosstraderError::InputValidation { .. }
            | CrosstraderError::ConfigParse { .. }
            | CrosstraderError::ConfigMissing { .. }
            | CrosstraderError::ConfigInvalid { .. } => 2,
            CrosstraderError::Database { .. } | CrosstraderError::DatabaseQuery { .. } => 3,
            CrosstraderError::MissingColumns { .. }
            | CrosstraderError::InvalidColumnValue { .. }
            | CrosstraderError::InvalidWindow { .. } => 4,
            CrosstraderError::NoData { .. }
            | CrosstraderError::InsufficientData { .. }
            | CrosstraderError::MalformedData { .. } => 5,
            CrosstraderError::EmptyBenchmarkIndex
            | CrosstraderError::BenchmarkDateMissing { .. }
            | CrosstraderError::InvalidBenchmarkPrice { .. }
            | CrosstraderError::CapitalTooSmall { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
