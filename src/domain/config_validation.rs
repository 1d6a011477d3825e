//! Configuration and user-input validation.
//!
//! Validates every config field before any data is loaded. The parsing
//! helpers are shared with the interactive prompts.

use crate::domain::error::CrosstraderError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_TRADE_COST: f64 = 5.0;
pub const DEFAULT_SHORT_WINDOW: i64 = 40;
pub const DEFAULT_LONG_WINDOW: i64 = 100;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    validate_ticker_key(config)?;
    validate_dates(config)?;
    validate_initial_capital(config)?;
    validate_trade_cost(config)?;
    validate_risk_free_rate(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    let short = window(config, "short_window", DEFAULT_SHORT_WINDOW)?;
    let long = window(config, "long_window", DEFAULT_LONG_WINDOW)?;
    if short >= long {
        return Err(invalid(
            "strategy",
            "short_window",
            "short_window must be smaller than long_window",
        ));
    }
    if let Some(raw) = config.get_string("strategy", "use_ml") {
        if parse_bool(&raw).is_none() {
            return Err(invalid("strategy", "use_ml", "expected true or false"));
        }
    }
    Ok(())
}

/// Uppercased, trimmed ticker. Must be non-empty and purely alphabetic.
pub fn validate_ticker(raw: &str) -> Result<String, CrosstraderError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(CrosstraderError::input("ticker", "cannot be empty"));
    }
    if !ticker.chars().all(char::is_alphabetic) {
        return Err(CrosstraderError::input(
            "ticker",
            "must only contain alphabetic characters",
        ));
    }
    Ok(ticker)
}

pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, CrosstraderError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CrosstraderError::input(field, "dates must be in YYYY-MM-DD format"))
}

pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), CrosstraderError> {
    if start >= end {
        return Err(CrosstraderError::input(
            "start_date",
            "start date must be before end date",
        ));
    }
    Ok(())
}

/// Parses capital strings such as `1000`, `$1,000` or `10 000.50`.
pub fn parse_capital(raw: &str) -> Result<f64, CrosstraderError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',') && !c.is_whitespace())
        .collect();
    let value: f64 = cleaned.parse().map_err(|_| {
        CrosstraderError::input("initial_capital", "enter a valid number like 1000")
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(CrosstraderError::input(
            "initial_capital",
            "enter a number greater than 0",
        ));
    }
    Ok(value)
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> CrosstraderError {
    CrosstraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn missing(section: &str, key: &str) -> CrosstraderError {
    CrosstraderError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_ticker_key(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    match config.get_string("backtest", "ticker") {
        Some(s) if !s.trim().is_empty() => validate_ticker(&s)
            .map(|_| ())
            .map_err(|e| invalid("backtest", "ticker", &reason_of(e))),
        _ => Err(missing("backtest", "ticker")),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    let start = config_date(config, "start_date")?;
    let end = config_date(config, "end_date")?;
    if start >= end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn config_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, CrosstraderError> {
    let raw = config
        .get_string("backtest", key)
        .ok_or_else(|| missing("backtest", key))?;
    parse_date(&raw, key).map_err(|_| {
        invalid(
            "backtest",
            key,
            &format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    if let Some(raw) = config.get_string("backtest", "initial_capital") {
        parse_capital(&raw).map_err(|e| invalid("backtest", "initial_capital", &reason_of(e)))?;
    }
    Ok(())
}

/// Reads a `[backtest]` float from its raw text, so unparseable values
/// are rejected instead of silently replaced by the default.
fn number(config: &dyn ConfigPort, key: &str, default: f64) -> Result<f64, CrosstraderError> {
    match config.get_string("backtest", key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| invalid("backtest", key, "expected a number")),
    }
}

fn validate_trade_cost(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    let value = number(config, "trade_cost", DEFAULT_TRADE_COST)?;
    if value.is_nan() || value < 0.0 {
        return Err(invalid(
            "backtest",
            "trade_cost",
            "trade_cost must be non-negative",
        ));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), CrosstraderError> {
    let value = number(config, "risk_free_rate", 0.0)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn window(config: &dyn ConfigPort, key: &str, default: i64) -> Result<i64, CrosstraderError> {
    let value = match config.get_string("strategy", key) {
        None => default,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid("strategy", key, "expected a positive integer"))?,
    };
    if value < 1 {
        return Err(invalid(
            "strategy",
            key,
            &format!("{key} must be at least 1"),
        ));
    }
    Ok(value)
}

fn reason_of(err: CrosstraderError) -> String {
    match err {
        CrosstraderError::InputValidation { reason, .. } => reason,
        other => other.to_string(),
    }
}
