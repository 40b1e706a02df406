use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::clock::Clock;
use crate::domain::format_date;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::persistence::{GatewayFuture, PersistenceGateway, StoreOutcome};
use crate::{DividendQuery, DividendRecord, IngestConfig, IngestError, Symbol, Ticker, UtcDateTime};

/// PostgREST (Supabase) gateway over the `tickers` and `dividends` tables.
#[derive(Clone)]
pub struct RestGateway {
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    base_url: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct NewTickerRow<'a> {
    symbol: &'a str,
    is_active: bool,
    created_at: UtcDateTime,
}

#[derive(Serialize)]
struct TickerTimestamps {
    last_dividend_update: UtcDateTime,
    last_polygon_call: UtcDateTime,
}

impl RestGateway {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        clock: Arc<dyn Clock>,
        config: &IngestConfig,
    ) -> Result<Self, IngestError> {
        let base_url = config
            .supabase_url
            .clone()
            .ok_or_else(|| IngestError::Config(String::from("SUPABASE_URL is not configured")))?;
        let key = config.supabase_key.clone().ok_or_else(|| {
            IngestError::Config(String::from("SUPABASE_ANON_KEY is not configured"))
        })?;

        Ok(Self {
            http_client,
            clock,
            base_url,
            auth: HttpAuth::HeaderAndBearer {
                name: String::from("apikey"),
                key,
            },
            timeout_ms: config.timeout_ms,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: HttpRequest,
    ) -> Result<HttpResponse, IngestError> {
        let request = request
            .with_auth(&self.auth)
            .with_timeout_ms(self.timeout_ms);
        debug!(operation, url = %request.url, "rest gateway request");

        self.http_client
            .execute(request)
            .await
            .map_err(|error| IngestError::persistence(operation, None, error.message()))
    }

    fn encode<T: Serialize + ?Sized>(operation: &'static str, value: &T) -> Result<String, IngestError> {
        serde_json::to_string(value)
            .map_err(|error| IngestError::persistence(operation, None, error.to_string()))
    }

    fn failure(operation: &'static str, response: HttpResponse) -> IngestError {
        IngestError::persistence(
            operation,
            Some(response.status),
            format!("status {}: {}", response.status, response.body),
        )
    }

    async fn upsert(&self, symbol: &Symbol) -> Result<(), IngestError> {
        const OP: &str = "upsert_ticker";
        let body = Self::encode(
            OP,
            &NewTickerRow {
                symbol: symbol.as_str(),
                is_active: true,
                created_at: self.clock.now(),
            },
        )?;

        let request = HttpRequest::post(self.table_url("tickers"))
            .with_header("prefer", "resolution=ignore-duplicates")
            .with_json_body(body);
        let response = self.send(OP, request).await?;

        if response.is_success() || response.status == 409 {
            Ok(())
        } else {
            Err(Self::failure(OP, response))
        }
    }

    async fn ticker_info(&self, symbol: &Symbol) -> Result<Option<Ticker>, IngestError> {
        const OP: &str = "get_ticker_info";
        let url = format!(
            "{}?symbol=eq.{}&select=*",
            self.table_url("tickers"),
            urlencoding::encode(symbol.as_str())
        );
        let response = self.send(OP, HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(Self::failure(OP, response));
        }

        let rows: Vec<Ticker> = serde_json::from_str(&response.body)
            .map_err(|error| IngestError::Decode(format!("ticker rows: {error}")))?;
        Ok(rows.into_iter().next())
    }

    async fn store(&self, records: &[DividendRecord]) -> Result<StoreOutcome, IngestError> {
        const OP: &str = "store_dividends";
        if records.is_empty() {
            return Ok(StoreOutcome::default());
        }

        let body = Self::encode(OP, records)?;
        let request = HttpRequest::post(format!(
            "{}?on_conflict=ticker,polygon_id",
            self.table_url("dividends")
        ))
        .with_header("prefer", "resolution=merge-duplicates")
        .with_json_body(body);
        let response = self.send(OP, request).await?;

        match response.status {
            409 => Ok(StoreOutcome::default()),
            _ if response.is_success() => Ok(StoreOutcome {
                inserted: records.len(),
                errors: 0,
            }),
            _ => Err(Self::failure(OP, response)),
        }
    }

    async fn touch(&self, symbol: &Symbol) -> Result<(), IngestError> {
        const OP: &str = "update_ticker_timestamp";
        let now = self.clock.now();
        let body = Self::encode(
            OP,
            &TickerTimestamps {
                last_dividend_update: now,
                last_polygon_call: now,
            },
        )?;
        let url = format!(
            "{}?symbol=eq.{}",
            self.table_url("tickers"),
            urlencoding::encode(symbol.as_str())
        );
        let response = self
            .send(OP, HttpRequest::patch(url).with_json_body(body))
            .await?;

        if response.is_success() {
            Ok(())
        } else {
            Err(Self::failure(OP, response))
        }
    }

    async fn active_tickers(&self) -> Result<Vec<Ticker>, IngestError> {
        const OP: &str = "list_active_tickers";
        let url = format!(
            "{}?is_active=eq.true&select=*&order=symbol.asc",
            self.table_url("tickers")
        );
        let response = self.send(OP, HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(Self::failure(OP, response));
        }

        serde_json::from_str(&response.body)
            .map_err(|error| IngestError::Decode(format!("ticker rows: {error}")))
    }

    async fn dividends(&self, query: &DividendQuery) -> Result<Vec<DividendRecord>, IngestError> {
        const OP: &str = "get_dividends";
        let mut url = format!(
            "{}?select=*&order=ex_dividend_date.desc",
            self.table_url("dividends")
        );
        if let Some(ticker) = &query.ticker {
            url.push_str(&format!("&ticker=eq.{}", urlencoding::encode(ticker.as_str())));
        }
        if let Some(start) = query.start_date {
            url.push_str(&format!("&ex_dividend_date=gte.{}", format_date(start)));
        }
        if let Some(end) = query.end_date {
            url.push_str(&format!("&ex_dividend_date=lte.{}", format_date(end)));
        }
        if let Some(limit) = query.limit {
            url.push_str(&format!("&limit={limit}"));
        }
        if let Some(offset) = query.offset {
            url.push_str(&format!("&offset={offset}"));
        }

        let response = self.send(OP, HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(Self::failure(OP, response));
        }

        serde_json::from_str(&response.body)
            .map_err(|error| IngestError::Decode(format!("dividend rows: {error}")))
    }
}

impl PersistenceGateway for RestGateway {
    fn backend(&self) -> &'static str {
        "rest"
    }

    fn upsert_ticker<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        Box::pin(self.upsert(symbol))
    }

    fn get_ticker_info<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, Option<Ticker>> {
        Box::pin(self.ticker_info(symbol))
    }

    fn store_dividends<'a>(
        &'a self,
        _symbol: &'a Symbol,
        records: &'a [DividendRecord],
    ) -> GatewayFuture<'a, StoreOutcome> {
        Box::pin(self.store(records))
    }

    fn update_ticker_timestamp<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        Box::pin(self.touch(symbol))
    }

    fn list_active_tickers(&self) -> GatewayFuture<'_, Vec<Ticker>> {
        Box::pin(self.active_tickers())
    }

    fn get_dividends<'a>(
        &'a self,
        query: &'a DividendQuery,
    ) -> GatewayFuture<'a, Vec<DividendRecord>> {
        Box::pin(self.dividends(query))
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::clock::FixedClock;
    use crate::http_client::{HttpError, HttpMethod};

    #[derive(Default)]
    struct ScriptedClient {
        responses: Mutex<Vec<HttpResponse>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedClient {
        fn with(responses: Vec<HttpResponse>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<HttpRequest> {
            self.requests.lock().expect("requests lock").clone()
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests.lock().expect("requests lock").push(request);
            let next = self.responses.lock().expect("responses lock").pop();
            Box::pin(async move { next.ok_or_else(|| HttpError::new("no scripted response")) })
        }
    }

    fn gateway(client: Arc<ScriptedClient>) -> RestGateway {
        let config = IngestConfig {
            supabase_url: Some(String::from("https://db.test")),
            supabase_key: Some(String::from("anon")),
            ..IngestConfig::default()
        };
        let clock = Arc::new(FixedClock::new(
            UtcDateTime::parse("2024-06-15T12:00:00Z").expect("timestamp"),
        ));
        RestGateway::new(client, clock, &config).expect("gateway")
    }

    fn symbol() -> Symbol {
        Symbol::parse("KO").expect("symbol")
    }

    #[test]
    fn missing_store_url_is_a_config_error() {
        let error = RestGateway::new(
            ScriptedClient::with(Vec::new()),
            Arc::new(FixedClock::new(UtcDateTime::now())),
            &IngestConfig::default(),
        )
        .err()
        .expect("config error");
        assert_eq!(error.kind(), "config_error");
    }

    #[tokio::test]
    async fn duplicate_ticker_is_success() {
        let client = ScriptedClient::with(vec![HttpResponse::new(409, "duplicate key")]);
        let gateway = gateway(client.clone());

        gateway.upsert_ticker(&symbol()).await.expect("409 is fine");

        let request = &client.requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://db.test/rest/v1/tickers");
        assert_eq!(request.header("apikey"), Some("anon"));
        assert_eq!(request.header("authorization"), Some("Bearer anon"));
        assert_eq!(request.header("prefer"), Some("resolution=ignore-duplicates"));
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().expect("body")).expect("json");
        assert_eq!(body["symbol"], "KO");
        assert_eq!(body["created_at"], "2024-06-15T12:00:00Z");
    }

    #[tokio::test]
    async fn upsert_failure_names_operation_and_status() {
        let client = ScriptedClient::with(vec![HttpResponse::new(500, "down")]);
        let error = gateway(client)
            .upsert_ticker(&symbol())
            .await
            .expect_err("500");
        assert_eq!(
            error,
            IngestError::persistence("upsert_ticker", Some(500), "status 500: down")
        );
    }

    #[tokio::test]
    async fn empty_store_makes_no_request() {
        let client = ScriptedClient::with(Vec::new());
        let outcome = gateway(client.clone())
            .store_dividends(&symbol(), &[])
            .await
            .expect("no-op");
        assert_eq!(outcome, StoreOutcome::default());
        assert!(client.requests().is_empty());
    }

    #[tokio::test]
    async fn ticker_lookup_returns_first_row_or_none() {
        let client = ScriptedClient::with(vec![
            HttpResponse::ok_json(
                r#"[{"symbol":"KO","is_active":true,"created_at":"2024-01-01T00:00:00+00:00","last_dividend_update":"2024-06-14T00:00:00+00:00","last_polygon_call":null}]"#,
            ),
            HttpResponse::ok_json("[]"),
        ]);
        let gateway = gateway(client.clone());

        let found = gateway.get_ticker_info(&symbol()).await.expect("lookup");
        assert!(found.and_then(|t| t.last_dividend_update).is_some());
        assert!(gateway
            .get_ticker_info(&symbol())
            .await
            .expect("lookup")
            .is_none());
        assert_eq!(
            client.requests()[0].url,
            "https://db.test/rest/v1/tickers?symbol=eq.KO&select=*"
        );
    }

    #[tokio::test]
    async fn timestamp_update_patches_both_columns() {
        let client = ScriptedClient::with(vec![HttpResponse::new(204, "")]);
        gateway(client.clone())
            .update_ticker_timestamp(&symbol())
            .await
            .expect("patch");

        let request = &client.requests()[0];
        assert_eq!(request.method, HttpMethod::Patch);
        let body: serde_json::Value =
            serde_json::from_str(request.body.as_deref().expect("body")).expect("json");
        assert_eq!(body["last_dividend_update"], "2024-06-15T12:00:00Z");
        assert_eq!(body["last_polygon_call"], "2024-06-15T12:00:00Z");
    }

    #[tokio::test]
    async fn dividend_query_builds_postgrest_filters() {
        let client = ScriptedClient::with(vec![HttpResponse::ok_json("[]")]);
        let query = DividendQuery {
            ticker: Some(symbol()),
            start_date: Some(time::macros::date!(2024 - 01 - 01)),
            end_date: None,
            limit: Some(10),
            offset: Some(20),
        };
        gateway(client.clone())
            .get_dividends(&query)
            .await
            .expect("query");
        assert_eq!(
            client.requests()[0].url,
            "https://db.test/rest/v1/dividends?select=*&order=ex_dividend_date.desc&ticker=eq.KO&ex_dividend_date=gte.2024-01-01&limit=10&offset=20"
        );
    }
}
