//! Shared in-memory collaborators for behavior tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use divtick_core::persistence::GatewayFuture;
use divtick_core::{
    BatchScheduler, Clock, DividendQuery, DividendRecord, DividendSource, FetchWindow, FixedClock,
    HttpClient, HttpError, HttpRequest, HttpResponse, IngestError, IngestionOrchestrator,
    NormalizationPolicy, Pacer, PersistenceGateway, RateBudget, RawDividend, RecordNormalizer,
    StoreOutcome, Symbol, Ticker, UtcDateTime,
};
use serde_json::json;

pub const NOW: &str = "2024-06-15T12:00:00Z";

pub fn at(value: &str) -> UtcDateTime {
    UtcDateTime::parse(value).expect("valid timestamp")
}

pub fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

pub fn raw_dividend(id: &str, ex_date: &str, amount: f64) -> RawDividend {
    serde_json::from_value(json!({
        "id": id,
        "ex_dividend_date": ex_date,
        "cash_amount": amount,
        "currency": "USD",
        "frequency": 4,
        "dividend_type": "CD"
    }))
    .expect("raw dividend")
}

// =============================================================================
// Persistence
// =============================================================================

/// Gateway backed by in-memory maps, with per-operation failure injection.
pub struct MemoryGateway {
    clock: Arc<dyn Clock>,
    tickers: Mutex<BTreeMap<String, Ticker>>,
    dividends: Mutex<BTreeMap<(String, String), DividendRecord>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryGateway {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tickers: Mutex::new(BTreeMap::new()),
            dividends: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn seed_ticker(&self, ticker: Ticker) {
        self.tickers
            .lock()
            .expect("tickers lock")
            .insert(ticker.symbol.as_str().to_owned(), ticker);
    }

    /// Make every later call of `operation` fail with a server error.
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().expect("failing lock").insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().expect("failing lock").remove(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn ticker(&self, symbol: &str) -> Option<Ticker> {
        self.tickers.lock().expect("tickers lock").get(symbol).cloned()
    }

    pub fn stored(&self, symbol: &str) -> Vec<DividendRecord> {
        self.dividends
            .lock()
            .expect("dividends lock")
            .iter()
            .filter(|((ticker, _), _)| ticker == symbol)
            .map(|(_, record)| record.clone())
            .collect()
    }

    fn enter(&self, operation: &'static str, symbol: Option<&Symbol>) -> Result<(), IngestError> {
        let entry = match symbol {
            Some(symbol) => format!("{operation}:{symbol}"),
            None => operation.to_owned(),
        };
        self.calls.lock().expect("calls lock").push(entry);

        if self.failing.lock().expect("failing lock").contains(operation) {
            return Err(IngestError::persistence(
                operation,
                Some(500),
                "status 500: injected failure",
            ));
        }
        Ok(())
    }
}

fn ready<'a, T: Send + 'a>(result: Result<T, IngestError>) -> GatewayFuture<'a, T> {
    Box::pin(std::future::ready(result))
}

impl PersistenceGateway for MemoryGateway {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn upsert_ticker<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        ready(self.enter("upsert_ticker", Some(symbol)).map(|()| {
            self.tickers
                .lock()
                .expect("tickers lock")
                .entry(symbol.as_str().to_owned())
                .or_insert_with(|| Ticker::new(symbol.clone(), self.clock.now()));
        }))
    }

    fn get_ticker_info<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, Option<Ticker>> {
        ready(
            self.enter("get_ticker_info", Some(symbol))
                .map(|()| self.ticker(symbol.as_str())),
        )
    }

    fn store_dividends<'a>(
        &'a self,
        symbol: &'a Symbol,
        records: &'a [DividendRecord],
    ) -> GatewayFuture<'a, StoreOutcome> {
        ready(self.enter("store_dividends", Some(symbol)).map(|()| {
            let mut dividends = self.dividends.lock().expect("dividends lock");
            let mut inserted = 0;
            for record in records {
                let key = (record.ticker.as_str().to_owned(), record.storage_key());
                if !dividends.contains_key(&key) {
                    dividends.insert(key, record.clone());
                    inserted += 1;
                }
            }
            StoreOutcome {
                inserted,
                errors: 0,
            }
        }))
    }

    fn update_ticker_timestamp<'a>(&'a self, symbol: &'a Symbol) -> GatewayFuture<'a, ()> {
        ready(
            self.enter("update_ticker_timestamp", Some(symbol))
                .and_then(|()| {
                    let now = self.clock.now();
                    let mut tickers = self.tickers.lock().expect("tickers lock");
                    let ticker = tickers.get_mut(symbol.as_str()).ok_or_else(|| {
                        IngestError::persistence("update_ticker_timestamp", None, "unknown ticker")
                    })?;
                    ticker.last_dividend_update = Some(now);
                    ticker.last_polygon_call = Some(now);
                    Ok(())
                }),
        )
    }

    fn list_active_tickers(&self) -> GatewayFuture<'_, Vec<Ticker>> {
        ready(self.enter("list_active_tickers", None).map(|()| {
            self.tickers
                .lock()
                .expect("tickers lock")
                .values()
                .filter(|ticker| ticker.is_active)
                .cloned()
                .collect()
        }))
    }

    fn get_dividends<'a>(
        &'a self,
        query: &'a DividendQuery,
    ) -> GatewayFuture<'a, Vec<DividendRecord>> {
        ready(self.enter("get_dividends", query.ticker.as_ref()).map(|()| {
            let mut rows: Vec<DividendRecord> = self
                .dividends
                .lock()
                .expect("dividends lock")
                .values()
                .filter(|record| query.ticker.as_ref().map_or(true, |t| &record.ticker == t))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.ex_dividend_date.cmp(&a.ex_dividend_date));
            rows
        }))
    }
}

// =============================================================================
// Market data
// =============================================================================

type Scripted = Result<Vec<RawDividend>, IngestError>;

/// Source that replays scripted responses per ticker and records every call.
pub struct ScriptedSource {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<(String, FetchWindow)>>,
    budget: Option<Arc<RateBudget>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            budget: None,
        }
    }

    pub fn with_budget(budget: Arc<RateBudget>) -> Self {
        Self {
            budget: Some(budget),
            ..Self::new()
        }
    }

    pub fn script(&self, ticker: &str, response: Scripted) {
        self.responses
            .lock()
            .expect("responses lock")
            .entry(ticker.to_owned())
            .or_default()
            .push_back(response);
    }

    pub fn calls(&self) -> Vec<(String, FetchWindow)> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn called_tickers(&self) -> Vec<String> {
        self.calls().into_iter().map(|(ticker, _)| ticker).collect()
    }
}

impl DividendSource for ScriptedSource {
    fn source_tag(&self) -> &'static str {
        "polygon"
    }

    fn fetch<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: &'a FetchWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawDividend>, IngestError>> + Send + 'a>> {
        let result = (|| -> Scripted {
            if let Some(budget) = &self.budget {
                budget
                    .try_acquire()
                    .map_err(|_| IngestError::RateLimitExceeded(String::from("local budget")))?;
            }
            self.calls
                .lock()
                .expect("calls lock")
                .push((symbol.as_str().to_owned(), *window));
            self.responses
                .lock()
                .expect("responses lock")
                .get_mut(symbol.as_str())
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(Vec::new()))
        })();
        Box::pin(std::future::ready(result))
    }
}

// =============================================================================
// Pacing and HTTP
// =============================================================================

/// Records requested pauses without sleeping.
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().expect("pauses lock").clone()
    }
}

impl Pacer for RecordingPacer {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.pauses.lock().expect("pauses lock").push(duration);
        Box::pin(std::future::ready(()))
    }
}

/// HTTP client that answers every request with the same response.
pub struct RecordingHttpClient {
    status: u16,
    body: String,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.requests.lock().expect("requests lock").push(request);
        Box::pin(std::future::ready(Ok(HttpResponse::new(
            self.status,
            self.body.clone(),
        ))))
    }
}

// =============================================================================
// Wiring
// =============================================================================

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub gateway: Arc<MemoryGateway>,
    pub source: Arc<ScriptedSource>,
    pub pacer: Arc<RecordingPacer>,
    pub budget: Arc<RateBudget>,
    pub scheduler: BatchScheduler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(NormalizationPolicy::Coerce)
    }

    pub fn with_policy(policy: NormalizationPolicy) -> Self {
        let clock = Arc::new(FixedClock::new(at(NOW)));
        let gateway = Arc::new(MemoryGateway::new(clock.clone()));
        let source = Arc::new(ScriptedSource::new());
        let pacer = Arc::new(RecordingPacer::default());
        let budget = Arc::new(RateBudget::default());

        let orchestrator = IngestionOrchestrator::new(
            source.clone(),
            gateway.clone(),
            RecordNormalizer::new(policy, "polygon"),
            clock.clone(),
        );
        let scheduler = BatchScheduler::new(orchestrator, budget.clone(), pacer.clone());

        Self {
            clock,
            gateway,
            source,
            pacer,
            budget,
            scheduler,
        }
    }

    pub fn orchestrator(&self) -> &IngestionOrchestrator {
        self.scheduler.orchestrator()
    }
}
