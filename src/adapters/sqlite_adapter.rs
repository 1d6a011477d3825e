//! SQLite portfolio store.
//!
//! Each run replaces the `portfolio` table wholesale: drop, create and
//! insert happen in a single transaction, so a failed write leaves the
//! previous run's rows intact.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::CrosstraderError;
use crate::domain::portfolio::PortfolioRecord;
use crate::domain::table::{format_date, DATE_FORMAT};
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::ResultSink;
use chrono::NaiveDate;
use log::info;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "results.db";

/// One persisted portfolio row.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPortfolioRow {
    pub date: NaiveDate,
    pub cash: f64,
    pub holdings: f64,
    pub total: f64,
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> CrosstraderError {
    CrosstraderError::Database {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> CrosstraderError {
    CrosstraderError::DatabaseQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, CrosstraderError> {
        let db_path = config
            .get_string("sqlite", "path")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        Self::open(Path::new(&db_path))
    }

    pub fn open(path: &Path) -> Result<Self, CrosstraderError> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder()
            .max_size(2)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, CrosstraderError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn save_portfolio(&self, records: &[PortfolioRecord]) -> Result<(), CrosstraderError> {
        let mut conn = self.pool.get().map_err(pool_error)?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute_batch(
            "DROP TABLE IF EXISTS portfolio;
             CREATE TABLE portfolio (
                date TEXT PRIMARY KEY,
                cash REAL NOT NULL,
                holdings REAL NOT NULL,
                total REAL NOT NULL
             );",
        )
        .map_err(query_error)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO portfolio (date, cash, holdings, total)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(query_error)?;
            for record in records {
                stmt.execute(params![
                    format_date(record.date),
                    record.cash,
                    record.holdings,
                    record.total
                ])
                .map_err(query_error)?;
            }
        }

        tx.commit().map_err(query_error)?;
        Ok(())
    }

    pub fn load_portfolio(&self) -> Result<Vec<StoredPortfolioRow>, CrosstraderError> {
        let conn = self.pool.get().map_err(pool_error)?;

        let mut stmt = conn
            .prepare("SELECT date, cash, holdings, total FROM portfolio ORDER BY date ASC")
            .map_err(query_error)?;

        let rows = stmt
            .query_map([], |row| {
                let date_str: String = row.get(0)?;
                let date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        date_str.len(),
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(StoredPortfolioRow {
                    date,
                    cash: row.get(1)?,
                    holdings: row.get(2)?,
                    total: row.get(3)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
    }
}

impl ResultSink for SqliteAdapter {
    fn write(&self, result: &BacktestResult) -> Result<(), CrosstraderError> {
        self.save_portfolio(&result.simulation.records)?;
        info!(
            "saved {} portfolio rows to sqlite",
            result.simulation.records.len()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
