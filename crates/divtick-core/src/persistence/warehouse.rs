use std::sync::Arc;

use divtick_warehouse::{DividendFilter, DividendRow, TickerRow, Warehouse, WarehouseError};

use crate::clock::Clock;
use crate::domain::format_date;
use crate::persistence::{GatewayFuture, PersistenceGateway, StoreOutcome};
use crate::{DividendQuery, DividendRecord, IngestError, Symbol, Ticker, UtcDateTime};

/// Local DuckDB gateway. Blocking warehouse calls run on tokio's blocking pool.
#[derive(Clone)]
pub struct WarehouseGateway {
    warehouse: Warehouse,
    clock: Arc<dyn Clock>,
}

impl WarehouseGateway {
    pub fn new(warehouse: Warehouse, clock: Arc<dyn Clock>) -> Self {
        Self { warehouse, clock }
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    async fn run<T, F>(&self, operation: &'static str, work: F) -> Result<T, IngestError>
    where
        T: Send + 'static,
        F: FnOnce(Warehouse) -> Result<T, WarehouseError> + Send + 'static,
    {
        let warehouse = self.warehouse.clone();
        tokio::task::spawn_blocking(move || work(warehouse))
            .await
            .map_err(|error| IngestError::persistence(operation, None, error.to_string()))?
            .map_err(|error| IngestError::persistence(operation, None, error.to_string()))
    }
}

impl PersistenceGateway for WarehouseGateway {
    fn backend(&self) -> &'static str {
        "warehouse"
    }

    fn upsert_ticker<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let symbol = symbol.as_str().to_owned();
            let created_at = self.clock.now().format_rfc3339();
            self.run("upsert_ticker", move |warehouse| {
                warehouse.upsert_ticker(&symbol, &created_at).map(|_| ())
            })
            .await
        })
    }

    fn get_ticker_info<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, Option<Ticker>> {
        Box::pin(async move {
            let symbol = symbol.as_str().to_owned();
            let row = self
                .run("get_ticker_info", move |warehouse| warehouse.ticker(&symbol))
                .await?;
            row.map(ticker_from_row).transpose()
        })
    }

    fn store_dividends<'a>(
        &'a self,
        _symbol: &'a Symbol,
        records: &'a [DividendRecord],
    ) -> GatewayFuture<'a, StoreOutcome> {
        Box::pin(async move {
            if records.is_empty() {
                return Ok(StoreOutcome::default());
            }

            let rows: Vec<DividendRow> = records.iter().map(row_from_record).collect();
            let inserted = self
                .run("store_dividends", move |warehouse| {
                    warehouse.insert_dividends(&rows)
                })
                .await?;
            Ok(StoreOutcome {
                inserted,
                errors: 0,
            })
        })
    }

    fn update_ticker_timestamp<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let key = symbol.as_str().to_owned();
            let now = self.clock.now().format_rfc3339();
            let updated = self
                .run("update_ticker_timestamp", move |warehouse| {
                    warehouse.touch_ticker(&key, &now)
                })
                .await?;
            if updated {
                Ok(())
            } else {
                Err(IngestError::persistence(
                    "update_ticker_timestamp",
                    None,
                    format!("ticker {symbol} is not registered"),
                ))
            }
        })
    }

    fn list_active_tickers(&self) -> GatewayFuture<'_, Vec<Ticker>> {
        Box::pin(async move {
            let rows = self
                .run("list_active_tickers", |warehouse| warehouse.active_tickers())
                .await?;
            rows.into_iter().map(ticker_from_row).collect()
        })
    }

    fn get_dividends<'a>(
        &'a self,
        query: &'a DividendQuery,
    ) -> GatewayFuture<'a, Vec<DividendRecord>> {
        Box::pin(async move {
            let filter = DividendFilter {
                ticker: query.ticker.as_ref().map(|ticker| ticker.as_str().to_owned()),
                start_date: query.start_date.map(format_date),
                end_date: query.end_date.map(format_date),
                limit: query.limit,
                offset: query.offset,
            };
            let rows = self
                .run("get_dividends", move |warehouse| warehouse.dividends(&filter))
                .await?;
            rows.into_iter().map(record_from_row).collect()
        })
    }
}

fn parse_timestamp(value: Option<String>) -> Result<Option<UtcDateTime>, IngestError> {
    value
        .map(|value| UtcDateTime::parse(&value))
        .transpose()
        .map_err(|error| IngestError::Decode(error.to_string()))
}

fn ticker_from_row(row: TickerRow) -> Result<Ticker, IngestError> {
    Ok(Ticker {
        symbol: Symbol::parse(&row.symbol).map_err(|error| IngestError::Decode(error.to_string()))?,
        is_active: row.is_active,
        created_at: parse_timestamp(Some(row.created_at))?,
        last_dividend_update: parse_timestamp(row.last_dividend_update)?,
        last_polygon_call: parse_timestamp(row.last_polygon_call)?,
    })
}

fn row_from_record(record: &DividendRecord) -> DividendRow {
    DividendRow {
        ticker: record.ticker.as_str().to_owned(),
        dividend_key: record.storage_key(),
        declaration_date: record.declaration_date.clone(),
        record_date: record.record_date.clone(),
        ex_dividend_date: record.ex_dividend_date.clone(),
        pay_date: record.pay_date.clone(),
        amount: record.amount,
        currency: record.currency.clone(),
        frequency: i32::try_from(record.frequency).unwrap_or(i32::MAX),
        dividend_type: record.dividend_type.clone(),
        polygon_id: record.polygon_id.clone(),
        data_source: record.data_source.clone(),
        created_at: record.created_at.format_rfc3339(),
    }
}

fn record_from_row(row: DividendRow) -> Result<DividendRecord, IngestError> {
    Ok(DividendRecord {
        ticker: Symbol::parse(&row.ticker).map_err(|error| IngestError::Decode(error.to_string()))?,
        declaration_date: row.declaration_date,
        record_date: row.record_date,
        ex_dividend_date: row.ex_dividend_date,
        pay_date: row.pay_date,
        amount: row.amount,
        currency: row.currency,
        frequency: u32::try_from(row.frequency).unwrap_or(0),
        dividend_type: row.dividend_type,
        polygon_id: row.polygon_id,
        data_source: row.data_source,
        created_at: UtcDateTime::parse(&row.created_at)
            .map_err(|error| IngestError::Decode(error.to_string()))?,
    })
}
