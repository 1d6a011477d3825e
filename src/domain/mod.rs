//! Core domain types and logic.

pub mod error;
pub mod price;
pub mod indicator;
pub mod classifier;
pub mod signal;
pub mod position;
pub mod execution;
pub mod portfolio;
pub mod benchmark;
pub mod metrics;
pub mod backtest;
pub mod table;
pub mod config_validation;
