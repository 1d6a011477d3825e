//! Result sink port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrosstraderError;

/// Somewhere a finished run is written: a file, a database, a chart.
pub trait ResultSink {
    fn write(&self, result: &BacktestResult) -> Result<(), CrosstraderError>;

    /// Short label for progress messages.
    fn name(&self) -> &str;
}
