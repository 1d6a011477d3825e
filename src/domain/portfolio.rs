//! Portfolio simulation over a signal frame.
//!
//! The simulation is a left fold: each bar takes the previous [`Account`]
//! and yields the next one plus one immutable [`PortfolioRecord`]. Bars are
//! consumed strictly in the order given.

use chrono::NaiveDate;

use super::execution::{buy, sell_all, Account};
use super::position::Fill;
use super::signal::SignalRecord;

/// The three signal-frame fields the simulator reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeBar {
    pub date: NaiveDate,
    pub close: f64,
    pub position: i8,
}

impl From<&SignalRecord> for TradeBar {
    fn from(record: &SignalRecord) -> Self {
        TradeBar {
            date: record.date,
            close: record.close,
            position: record.position,
        }
    }
}

pub fn trade_bars(records: &[SignalRecord]) -> Vec<TradeBar> {
    records.iter().map(TradeBar::from).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub initial_capital: f64,
    /// Flat fee charged on every fill, entry and exit alike.
    pub trade_cost: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_capital: 10_000.0,
            trade_cost: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioRecord {
    pub date: NaiveDate,
    pub cash: f64,
    pub shares: u64,
    pub holdings: f64,
    pub total: f64,
}

impl PortfolioRecord {
    fn mark(date: NaiveDate, account: &Account, price: f64) -> Self {
        let holdings = account.holdings(price);
        PortfolioRecord {
            date,
            cash: account.cash,
            shares: account.shares,
            holdings,
            total: account.cash + holdings,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResult {
    pub records: Vec<PortfolioRecord>,
    pub fills: Vec<Fill>,
}

impl SimulationResult {
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    pub fn equity(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.total).collect()
    }

    pub fn final_total(&self) -> Option<f64> {
        self.records.last().map(|r| r.total)
    }
}

/// One bar of the state machine.
///
/// +1 buys with all available cash, -1 liquidates an open position, any
/// other bar only re-marks holdings.
pub fn step(account: Account, bar: &TradeBar, config: &SimulationConfig) -> (Account, Option<Fill>) {
    match bar.position {
        1 => buy(account, bar.date, bar.close, config.trade_cost),
        -1 => sell_all(account, bar.date, bar.close, config.trade_cost),
        _ => (account, None),
    }
}

pub fn simulate(bars: &[TradeBar], config: &SimulationConfig) -> SimulationResult {
    let init = (
        Account::new(config.initial_capital),
        SimulationResult {
            records: Vec::with_capacity(bars.len()),
            fills: Vec::new(),
        },
    );

    let (_, result) = bars.iter().fold(init, |(account, mut result), bar| {
        let (next, fill) = step(account, bar, config);
        result.fills.extend(fill);
        result
            .records
            .push(PortfolioRecord::mark(bar.date, &next, bar.close));
        (next, result)
    });

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Side;

    fn bar(day: u32, close: f64, position: i8) -> TradeBar {
        TradeBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            close,
            position,
        }
    }

    fn config(capital: f64, fee: f64) -> SimulationConfig {
        SimulationConfig {
            initial_capital: capital,
            trade_cost: fee,
        }
    }

    #[test]
    fn no_edges_no_trades() {
        let bars: Vec<TradeBar> = (1..=5).map(|d| bar(d, 10.0, 0)).collect();
        let result = simulate(&bars, &config(1000.0, 5.0));
        assert!(result.fills.is_empty());
        assert!(result.records.iter().all(|r| r.total == 1000.0));
    }

    #[test]
    fn single_round_trip() {
        let bars = vec![
            bar(1, 9.0, 0),
            bar(2, 10.0, 1),
            bar(3, 15.0, 0),
            bar(4, 20.0, -1),
            bar(5, 25.0, 0),
        ];
        let result = simulate(&bars, &config(1005.0, 5.0));

        assert_eq!(result.fills.len(), 2);
        assert_eq!(result.fills[0].side, Side::Buy);
        assert_eq!(result.fills[0].shares, 100);

        let after_buy = &result.records[1];
        assert_eq!(after_buy.cash, 0.0);
        assert_eq!(after_buy.holdings, 1000.0);

        let mid = &result.records[2];
        assert_eq!(mid.holdings, 1500.0);
        assert_eq!(mid.total, 1500.0);

        let after_sell = &result.records[3];
        assert_eq!(after_sell.shares, 0);
        assert!((after_sell.cash - 1995.0).abs() < 1e-9);
        assert_eq!(result.records[4].total, after_sell.total);
    }

    #[test]
    fn sell_edge_while_flat_is_ignored() {
        let bars = vec![bar(1, 10.0, -1), bar(2, 10.0, 0)];
        let result = simulate(&bars, &config(1000.0, 5.0));
        assert!(result.fills.is_empty());
        assert_eq!(result.records[0].cash, 1000.0);
    }

    #[test]
    fn buy_edge_without_cash_is_ignored() {
        let bars = vec![bar(1, 500.0, 1)];
        let result = simulate(&bars, &config(100.0, 0.0));
        assert!(result.fills.is_empty());
        assert_eq!(result.records[0].total, 100.0);
    }

    #[test]
    fn accounting_identity_holds_every_bar() {
        let bars = vec![
            bar(1, 10.0, 1),
            bar(2, 12.3, 0),
            bar(3, 11.7, -1),
            bar(4, 9.1, 1),
            bar(5, 13.9, 0),
        ];
        let result = simulate(&bars, &config(777.77, 1.25));
        for r in &result.records {
            assert_eq!(r.total, r.cash + r.holdings);
            assert!(r.cash >= 0.0);
        }
    }

    #[test]
    fn empty_frame_yields_empty_result() {
        let result = simulate(&[], &SimulationConfig::default());
        assert!(result.records.is_empty());
        assert_eq!(result.final_total(), None);
    }
}
