#![allow(dead_code)]

use chrono::NaiveDate;
use crosstrader::domain::backtest::{BacktestConfig, BacktestResult};
use crosstrader::domain::error::CrosstraderError;
pub use crosstrader::domain::price::PriceBar;
use crosstrader::domain::portfolio::SimulationConfig;
use crosstrader::domain::signal::SignalConfig;
use crosstrader::ports::data_port::PriceDataPort;
use crosstrader::ports::result_port::ResultSink;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, ticker: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(ticker.to_string(), bars);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_closes(
        &self,
        ticker: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, CrosstraderError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(CrosstraderError::MalformedData {
                reason: reason.clone(),
            });
        }
        match self.data.get(ticker) {
            Some(bars) if !bars.is_empty() => Ok(bars.clone()),
            _ => Err(CrosstraderError::NoData {
                ticker: ticker.to_string(),
            }),
        }
    }
}

/// Records every result handed to it; clones share one log.
#[derive(Clone)]
pub struct RecordingSink {
    pub calls: Rc<RefCell<Vec<BacktestResult>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ResultSink for RecordingSink {
    fn write(&self, result: &BacktestResult) -> Result<(), CrosstraderError> {
        self.calls.borrow_mut().push(result.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn day(n: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 2).unwrap() + chrono::Duration::days(n as i64)
}

/// One bar per consecutive calendar day starting 2023-01-02.
pub fn dated(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(day(i), c))
        .collect()
}

pub fn flat(len: usize, price: f64) -> Vec<PriceBar> {
    dated(&vec![price; len])
}

/// Slow drift with a three-bar wobble, so both target classes occur.
pub fn choppy(len: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..len)
        .map(|i| {
            let wobble = if i % 3 == 0 { 2.0 } else { -1.0 };
            100.0 + 0.1 * i as f64 + wobble
        })
        .collect();
    dated(&closes)
}

/// Strictly rising: every target is 1.
pub fn rising(len: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..len).map(|i| 50.0 * 1.01_f64.powi(i as i32)).collect();
    dated(&closes)
}

/// Buy edge at $10 (bar 2), sell edge at $20 (bar 5) with 1/2 windows.
pub fn one_round_trip(len: usize) -> Vec<PriceBar> {
    let mut closes = vec![10.0, 9.0, 10.0, 15.0, 20.0];
    closes.resize(len, 20.0);
    dated(&closes)
}

pub fn config(
    short_window: usize,
    long_window: usize,
    use_ml: bool,
    initial_capital: f64,
    trade_cost: f64,
) -> BacktestConfig {
    BacktestConfig {
        ticker: "TEST".into(),
        start_date: day(0),
        end_date: day(365),
        signal: SignalConfig {
            short_window,
            long_window,
            use_ml,
        },
        simulation: SimulationConfig {
            initial_capital,
            trade_cost,
        },
        risk_free_rate: 0.0,
    }
}

pub fn write_csv(dir: &Path, ticker: &str, bars: &[PriceBar]) {
    let mut content = String::from("Date,Open,High,Low,Close,Volume\n");
    for bar in bars {
        writeln!(
            content,
            "{},{},{},{},{},1000",
            bar.date,
            bar.close,
            bar.close + 1.0,
            bar.close - 1.0,
            bar.close
        )
        .unwrap();
    }
    std::fs::write(dir.join(format!("{ticker}.csv")), content).unwrap();
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
