//! Concrete adapter implementations for ports.

pub mod chart_svg;
pub mod csv_adapter;
pub mod file_config_adapter;
pub mod json_export;
#[cfg(feature = "sqlite")]
pub mod sqlite_adapter;
