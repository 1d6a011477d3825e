//! Performance metrics for an equity curve.

use super::position::RoundTrip;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior peak.
    pub max_drawdown_duration: usize,
    pub total_trades: usize,
    pub trades_won: usize,
    pub win_rate: f64,
    pub avg_holding_days: f64,
}

impl Metrics {
    /// `equity` is one value per bar; `trips` may be empty (the benchmark
    /// never trades).
    pub fn compute(
        equity: &[f64],
        trips: &[RoundTrip],
        initial_capital: f64,
        risk_free_rate: f64,
    ) -> Self {
        let final_value = equity.last().copied().unwrap_or(initial_capital);
        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = equity.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return > -1.0 && total_return.is_finite() {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity);
        let sharpe_ratio = compute_sharpe(equity, risk_free_rate / TRADING_DAYS_PER_YEAR);

        let total_trades = trips.len();
        let trades_won = trips.iter().filter(|t| t.pnl > 0.0).count();
        let win_rate = if total_trades > 0 {
            trades_won as f64 / total_trades as f64
        } else {
            0.0
        };
        let avg_holding_days = if total_trades > 0 {
            trips.iter().map(|t| t.holding_days() as f64).sum::<f64>() / total_trades as f64
        } else {
            0.0
        };

        Metrics {
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_duration,
            total_trades,
            trades_won,
            win_rate,
            avg_holding_days,
        }
    }
}

fn compute_drawdown(equity: &[f64]) -> (f64, usize) {
    let Some(&first) = equity.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut run = 0usize;
    let mut longest = 0usize;

    for &value in equity {
        if value >= peak {
            peak = value;
            run = 0;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - value) / peak);
            run += 1;
            longest = longest.max(run);
        }
    }

    (max_dd, longest)
}

fn compute_sharpe(equity: &[f64], daily_rf: f64) -> f64 {
    let returns: Vec<f64> = equity
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let stddev = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n).sqrt();

    if stddev > 0.0 {
        (mean - daily_rf) / stddev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
