//! Storage collaborators for tickers and dividends.
//!
//! Both implementations keep writes idempotent: registering a known ticker or
//! re-storing known dividends succeeds without duplicating rows.

pub mod rest;
pub mod warehouse;

use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

use crate::{DividendQuery, DividendRecord, IngestError, Symbol, Ticker};

pub use rest::RestGateway;
pub use warehouse::WarehouseGateway;

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, IngestError>> + Send + 'a>>;

/// Result of one bulk dividend write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreOutcome {
    pub inserted: usize,
    pub errors: usize,
}

pub trait PersistenceGateway: Send + Sync {
    /// Backend name reported by `health`.
    fn backend(&self) -> &'static str;

    /// Insert-or-ignore the ticker row.
    fn upsert_ticker<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()>;

    fn get_ticker_info<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, Option<Ticker>>;

    /// Bulk idempotent write. Empty input must not touch the backend.
    fn store_dividends<'a>(
        &'a self,
        symbol: &'a Symbol,
        records: &'a [DividendRecord],
    ) -> GatewayFuture<'a, StoreOutcome>;

    /// Stamp `last_dividend_update` and `last_polygon_call` with the current time.
    fn update_ticker_timestamp<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()>;

    fn list_active_tickers(&self) -> GatewayFuture<'_, Vec<Ticker>>;

    /// Stored dividends, newest ex-dividend date first.
    fn get_dividends<'a>(&'a self, query: &'a DividendQuery)
        -> GatewayFuture<'a, Vec<DividendRecord>>;
}
