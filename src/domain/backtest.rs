//! Backtest pipeline: signals → simulation → benchmark → metrics.

use chrono::NaiveDate;
use log::info;

use super::benchmark::{buy_and_hold, Benchmark};
use super::error::CrosstraderError;
use super::metrics::Metrics;
use super::portfolio::{simulate, trade_bars, SimulationConfig, SimulationResult};
use super::position::{pair_round_trips, RoundTrip};
use super::price::{validate_price_series, PriceBar};
use super::signal::{generate_signals, SignalConfig, SignalRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub ticker: String,
    pub start_date: NaiveDate,
    /// Exclusive.
    pub end_date: NaiveDate,
    pub signal: SignalConfig,
    pub simulation: SimulationConfig,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub ticker: String,
    pub signals: Vec<SignalRecord>,
    pub simulation: SimulationResult,
    pub round_trips: Vec<RoundTrip>,
    pub benchmark: Benchmark,
    pub strategy_metrics: Metrics,
    pub benchmark_metrics: Metrics,
}

pub fn run_backtest(
    prices: &[PriceBar],
    config: &BacktestConfig,
) -> Result<BacktestResult, CrosstraderError> {
    validate_price_series(&config.ticker, prices)?;
    info!("{}: {} price bars loaded", config.ticker, prices.len());

    let signals = generate_signals(prices, &config.signal)?;
    let ml_active = signals.iter().any(|r| r.ml_confidence > 0.0);
    info!(
        "signals generated (short={}, long={}, ml={})",
        config.signal.short_window,
        config.signal.long_window,
        if ml_active { "on" } else { "off" }
    );

    let simulation = simulate(&trade_bars(&signals), &config.simulation);
    let round_trips = pair_round_trips(&simulation.fills);
    info!(
        "simulation complete: {} fills, {} round trips",
        simulation.fills.len(),
        round_trips.len()
    );

    let benchmark = buy_and_hold(
        prices,
        &simulation.dates(),
        config.simulation.initial_capital,
    )?;
    info!("benchmark holds {} shares", benchmark.shares);

    let strategy_metrics = Metrics::compute(
        &simulation.equity(),
        &round_trips,
        config.simulation.initial_capital,
        config.risk_free_rate,
    );
    let benchmark_metrics = Metrics::compute(
        &benchmark.equity(),
        &[],
        config.simulation.initial_capital,
        config.risk_free_rate,
    );

    Ok(BacktestResult {
        ticker: config.ticker.clone(),
        signals,
        simulation,
        round_trips,
        benchmark,
        strategy_metrics,
        benchmark_metrics,
    })
}
