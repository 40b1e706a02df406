//! # Divtick Warehouse
//!
//! Local `DuckDB` storage for tracked tickers and their dividend events.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `tickers` | Tracked symbols with ingestion timestamps |
//! | `dividends` | Dividend events keyed by `(ticker, dividend_key)` |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Idempotency
//!
//! Every write is an insert-or-ignore: registering a known ticker or storing a
//! dividend that already exists is a successful no-op. Re-running an ingestion
//! never duplicates rows.
//!
//! ```rust,no_run
//! use divtick_warehouse::{Warehouse, WarehouseConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warehouse = Warehouse::open(WarehouseConfig::default())?;
//!     warehouse.upsert_ticker("aapl", "2024-06-15T00:00:00Z")?;
//!     let ticker = warehouse.ticker("AAPL")?.expect("registered above");
//!     assert_eq!(ticker.symbol, "AAPL");
//!     Ok(())
//! }
//! ```

pub mod duckdb;
pub mod migrations;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::types::ToSql;
use ::duckdb::{params, Connection, OptionalExt, Row};
use serde::Serialize;
use thiserror::Error;

pub use crate::duckdb::{DuckDbConnectionManager, PooledConnection};

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Write rejected because its input is unusable.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Configuration for the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for divtick data.
    pub divtick_home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept by the pool.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self::with_home(resolve_divtick_home())
    }
}

impl WarehouseConfig {
    pub fn with_home(divtick_home: impl Into<PathBuf>) -> Self {
        let divtick_home = divtick_home.into();
        let db_path = divtick_home.join("warehouse.duckdb");
        Self {
            divtick_home,
            db_path,
            max_pool_size: 4,
        }
    }
}

/// A tracked ticker row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerRow {
    pub symbol: String,
    pub is_active: bool,
    pub created_at: String,
    pub last_dividend_update: Option<String>,
    pub last_polygon_call: Option<String>,
}

/// A stored dividend event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DividendRow {
    pub ticker: String,
    /// Idempotency key, unique per ticker.
    pub dividend_key: String,
    pub declaration_date: Option<String>,
    pub record_date: Option<String>,
    pub ex_dividend_date: String,
    pub pay_date: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub frequency: i32,
    pub dividend_type: String,
    pub polygon_id: Option<String>,
    pub data_source: String,
    pub created_at: String,
}

/// Read filter for dividend queries. All bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DividendFilter {
    pub ticker: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Ticker and dividend storage backed by `DuckDB`.
#[derive(Clone)]
pub struct Warehouse {
    manager: DuckDbConnectionManager,
}

impl Warehouse {
    /// Open a warehouse with default configuration.
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open a warehouse, creating the database file and schema if needed.
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = DuckDbConnectionManager::open(config.db_path.clone(), config.max_pool_size)?;
        let warehouse = Self { manager };
        warehouse.initialize()?;
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.manager.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.manager.db_path()
    }

    /// Register a ticker. Returns `true` when the row was newly created.
    pub fn upsert_ticker(&self, symbol: &str, created_at: &str) -> Result<bool, WarehouseError> {
        let symbol = canonical_symbol(symbol)?;
        let connection = self.manager.acquire()?;
        let inserted = connection.execute(
            "INSERT OR IGNORE INTO tickers (symbol, is_active, created_at) VALUES (?, TRUE, ?)",
            params![symbol, created_at],
        )?;
        Ok(inserted > 0)
    }

    pub fn ticker(&self, symbol: &str) -> Result<Option<TickerRow>, WarehouseError> {
        let symbol = canonical_symbol(symbol)?;
        let connection = self.manager.acquire()?;
        let row = connection
            .query_row(
                "SELECT symbol, is_active, created_at, last_dividend_update, last_polygon_call \
                 FROM tickers WHERE symbol = ?",
                params![symbol],
                ticker_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn active_tickers(&self) -> Result<Vec<TickerRow>, WarehouseError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT symbol, is_active, created_at, last_dividend_update, last_polygon_call \
             FROM tickers WHERE is_active ORDER BY symbol",
        )?;
        let rows = statement
            .query_map([], ticker_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Stamp both ingestion timestamps. Returns `false` when the ticker is unknown.
    pub fn touch_ticker(&self, symbol: &str, at: &str) -> Result<bool, WarehouseError> {
        let symbol = canonical_symbol(symbol)?;
        let connection = self.manager.acquire()?;
        let updated = connection.execute(
            "UPDATE tickers SET last_dividend_update = ?, last_polygon_call = ? WHERE symbol = ?",
            params![at, at, symbol],
        )?;
        Ok(updated > 0)
    }

    /// Insert dividends that are not already stored. Returns the number of new rows.
    pub fn insert_dividends(&self, rows: &[DividendRow]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let connection = self.manager.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut inserted = 0;
            for row in rows {
                let ticker = canonical_symbol(&row.ticker)?;
                let existing: i64 = connection.query_row(
                    "SELECT COUNT(*) FROM dividends WHERE ticker = ? AND dividend_key = ?",
                    params![ticker, row.dividend_key],
                    |r| r.get(0),
                )?;
                if existing > 0 {
                    continue;
                }

                let params: [&dyn ToSql; 13] = [
                    &ticker,
                    &row.dividend_key,
                    &row.declaration_date,
                    &row.record_date,
                    &row.ex_dividend_date,
                    &row.pay_date,
                    &row.amount,
                    &row.currency,
                    &row.frequency,
                    &row.dividend_type,
                    &row.polygon_id,
                    &row.data_source,
                    &row.created_at,
                ];
                connection.execute(
                    "INSERT INTO dividends \
                     (ticker, dividend_key, declaration_date, record_date, ex_dividend_date, \
                      pay_date, amount, currency, frequency, type, polygon_id, data_source, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    params.as_slice(),
                )?;
                inserted += 1;
            }
            Ok(inserted)
        })();

        finalize_transaction(&connection, result)
    }

    /// Query dividends, newest ex-dividend date first.
    pub fn dividends(&self, filter: &DividendFilter) -> Result<Vec<DividendRow>, WarehouseError> {
        let mut sql = String::from(
            "SELECT ticker, dividend_key, declaration_date, record_date, ex_dividend_date, \
             pay_date, amount, currency, frequency, type, polygon_id, data_source, created_at \
             FROM dividends WHERE 1 = 1",
        );
        let mut values: Vec<String> = Vec::new();

        if let Some(ticker) = &filter.ticker {
            sql.push_str(" AND ticker = ?");
            values.push(canonical_symbol(ticker)?);
        }
        if let Some(start) = &filter.start_date {
            sql.push_str(" AND ex_dividend_date >= ?");
            values.push(start.clone());
        }
        if let Some(end) = &filter.end_date {
            sql.push_str(" AND ex_dividend_date <= ?");
            values.push(end.clone());
        }
        sql.push_str(" ORDER BY ex_dividend_date DESC, ticker");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let params: Vec<&dyn ToSql> = values.iter().map(|value| value as &dyn ToSql).collect();
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let rows = statement
            .query_map(params.as_slice(), dividend_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn ticker_from_row(row: &Row<'_>) -> Result<TickerRow, ::duckdb::Error> {
    Ok(TickerRow {
        symbol: row.get(0)?,
        is_active: row.get(1)?,
        created_at: row.get(2)?,
        last_dividend_update: row.get(3)?,
        last_polygon_call: row.get(4)?,
    })
}

fn dividend_from_row(row: &Row<'_>) -> Result<DividendRow, ::duckdb::Error> {
    Ok(DividendRow {
        ticker: row.get(0)?,
        dividend_key: row.get(1)?,
        declaration_date: row.get(2)?,
        record_date: row.get(3)?,
        ex_dividend_date: row.get(4)?,
        pay_date: row.get(5)?,
        amount: row.get(6)?,
        currency: row.get(7)?,
        frequency: row.get(8)?,
        dividend_type: row.get(9)?,
        polygon_id: row.get(10)?,
        data_source: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn canonical_symbol(symbol: &str) -> Result<String, WarehouseError> {
    let trimmed = symbol.trim();
    if trimmed.is_empty() {
        return Err(WarehouseError::InvalidRecord(String::from(
            "ticker symbol cannot be empty",
        )));
    }
    Ok(trimmed.to_ascii_uppercase())
}

fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn resolve_divtick_home() -> PathBuf {
    if let Some(path) = env::var_os("DIVTICK_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".divtick");
    }

    PathBuf::from(".divtick")
}
