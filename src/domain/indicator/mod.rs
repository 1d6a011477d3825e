//! Rolling-window indicator calculations over close prices.

pub mod returns;
pub mod sma;

pub use returns::{lead, pct_change};
pub use sma::{rolling_mean, rolling_mean_defined};
