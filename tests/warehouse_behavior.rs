//! Behavior tests for the DuckDB-backed gateway.

mod support;

use std::sync::Arc;

use divtick_core::{
    DividendQuery, FetchMode, FixedClock, IngestionOrchestrator, NormalizationPolicy, Outcome,
    PersistenceGateway, ProcessOptions, RecordNormalizer, StalenessReason, Warehouse,
    WarehouseConfig, WarehouseGateway,
};
use tempfile::TempDir;
use time::macros::date;

use support::{at, raw_dividend, symbol, ScriptedSource, NOW};

struct Fixture {
    _dir: TempDir,
    clock: Arc<FixedClock>,
    gateway: Arc<WarehouseGateway>,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let warehouse = Warehouse::open(WarehouseConfig::with_home(dir.path())).expect("warehouse");
    let clock = Arc::new(FixedClock::new(at(NOW)));
    let gateway = Arc::new(WarehouseGateway::new(warehouse, clock.clone()));
    Fixture {
        _dir: dir,
        clock,
        gateway,
    }
}

fn records(ticker: &str, raws: &[divtick_core::RawDividend]) -> Vec<divtick_core::DividendRecord> {
    RecordNormalizer::new(NormalizationPolicy::Coerce, "polygon")
        .normalize_all(&symbol(ticker), raws, at(NOW))
        .records
}

// =============================================================================
// Tickers
// =============================================================================

#[tokio::test]
async fn lowercase_registration_is_stored_canonically() {
    // Given: a ticker registered in lowercase straight through the warehouse
    let fixture = fixture();
    fixture
        .gateway
        .warehouse()
        .upsert_ticker("aapl", "2024-06-15T12:00:00Z")
        .expect("upsert");

    // When
    let ticker = fixture
        .gateway
        .get_ticker_info(&symbol("AAPL"))
        .await
        .expect("lookup")
        .expect("registered");

    // Then
    assert_eq!(ticker.symbol.as_str(), "AAPL");
    assert!(ticker.is_active);
    assert_eq!(ticker.created_at, Some(at(NOW)));
    assert_eq!(ticker.last_dividend_update, None);
}

#[tokio::test]
async fn repeated_upsert_keeps_the_first_row() {
    let fixture = fixture();
    let ko = symbol("KO");

    fixture.gateway.upsert_ticker(&ko).await.expect("first");
    fixture.gateway.update_ticker_timestamp(&ko).await.expect("stamp");
    fixture.clock.set(at("2024-06-16T12:00:00Z"));
    fixture.gateway.upsert_ticker(&ko).await.expect("second");

    let ticker = fixture
        .gateway
        .get_ticker_info(&ko)
        .await
        .expect("lookup")
        .expect("registered");
    assert_eq!(ticker.created_at, Some(at(NOW)));
    assert_eq!(ticker.last_dividend_update, Some(at(NOW)));
}

#[tokio::test]
async fn active_tickers_are_listed_in_symbol_order() {
    let fixture = fixture();
    for value in ["MSFT", "AAPL", "KO"] {
        fixture
            .gateway
            .upsert_ticker(&symbol(value))
            .await
            .expect("upsert");
    }

    let tickers = fixture.gateway.list_active_tickers().await.expect("list");

    let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
    assert_eq!(symbols, ["AAPL", "KO", "MSFT"]);
}

// =============================================================================
// Dividends
// =============================================================================

#[tokio::test]
async fn storing_the_same_dividends_twice_inserts_once() {
    // Given
    let fixture = fixture();
    let ko = symbol("KO");
    fixture.gateway.upsert_ticker(&ko).await.expect("upsert");
    let batch = records(
        "KO",
        &[
            raw_dividend("k1", "2024-06-14", 0.485),
            raw_dividend("k2", "2024-03-14", 0.485),
        ],
    );

    // When
    let first = fixture
        .gateway
        .store_dividends(&ko, &batch)
        .await
        .expect("first store");
    let second = fixture
        .gateway
        .store_dividends(&ko, &batch)
        .await
        .expect("second store");

    // Then
    assert_eq!(first.inserted, 2);
    assert_eq!(second.inserted, 0);
    let stored = fixture
        .gateway
        .get_dividends(&DividendQuery::for_ticker(ko))
        .await
        .expect("read back");
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn storing_nothing_is_a_no_op() {
    let fixture = fixture();

    let outcome = fixture
        .gateway
        .store_dividends(&symbol("KO"), &[])
        .await
        .expect("empty store");

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.errors, 0);
}

#[tokio::test]
async fn queries_filter_by_date_and_sort_newest_first() {
    // Given: three KO dividends and one PEP dividend
    let fixture = fixture();
    let ko = symbol("KO");
    let pep = symbol("PEP");
    fixture.gateway.upsert_ticker(&ko).await.expect("upsert");
    fixture.gateway.upsert_ticker(&pep).await.expect("upsert");
    fixture
        .gateway
        .store_dividends(
            &ko,
            &records(
                "KO",
                &[
                    raw_dividend("k1", "2023-11-30", 0.46),
                    raw_dividend("k2", "2024-06-14", 0.485),
                    raw_dividend("k3", "2024-03-14", 0.485),
                ],
            ),
        )
        .await
        .expect("store");
    fixture
        .gateway
        .store_dividends(&pep, &records("PEP", &[raw_dividend("p1", "2024-06-07", 1.355)]))
        .await
        .expect("store");

    // When
    let query = DividendQuery {
        ticker: Some(ko),
        start_date: Some(date!(2024 - 01 - 01)),
        end_date: Some(date!(2024 - 12 - 31)),
        ..DividendQuery::default()
    };
    let rows = fixture.gateway.get_dividends(&query).await.expect("query");
    let all = fixture
        .gateway
        .get_dividends(&DividendQuery {
            limit: Some(2),
            ..DividendQuery::default()
        })
        .await
        .expect("query");

    // Then
    let dates: Vec<&str> = rows.iter().map(|r| r.ex_dividend_date.as_str()).collect();
    assert_eq!(dates, ["2024-06-14", "2024-03-14"]);
    assert_eq!(rows[0].polygon_id.as_deref(), Some("k2"));
    assert_eq!(rows[0].frequency, 4);
    let tickers: Vec<&str> = all.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, ["KO", "PEP"]);
}

// =============================================================================
// End to end
// =============================================================================

#[tokio::test]
async fn orchestrated_run_persists_and_then_skips_recent_data() {
    // Given: an orchestrator writing to a fresh warehouse
    let fixture = fixture();
    let source = Arc::new(ScriptedSource::new());
    source.script(
        "JNJ",
        Ok(vec![
            raw_dividend("j1", "2024-05-20", 1.24),
            raw_dividend("j2", "2024-02-16", 1.19),
        ]),
    );
    let orchestrator = IngestionOrchestrator::new(
        source.clone(),
        fixture.gateway.clone(),
        RecordNormalizer::new(NormalizationPolicy::Coerce, "polygon"),
        fixture.clock.clone(),
    );

    // When: the ticker is processed, then processed again an hour later
    let first = orchestrator
        .process_ticker("jnj", ProcessOptions::default())
        .await;
    fixture.clock.set(at("2024-06-15T13:00:00Z"));
    let second = orchestrator
        .process_ticker("JNJ", ProcessOptions::default())
        .await;

    // Then
    assert_eq!(first.outcome, Outcome::Processed);
    assert_eq!(first.reason, Some(StalenessReason::NewTicker));
    assert_eq!(first.dividends.stored, 2);
    assert_eq!(first.fetch_mode, FetchMode::Historical);
    assert_eq!(second.outcome, Outcome::Skipped);
    assert_eq!(second.reason, Some(StalenessReason::RecentData));
    assert_eq!(source.called_tickers(), vec!["JNJ"]);

    let ticker = fixture
        .gateway
        .get_ticker_info(&symbol("JNJ"))
        .await
        .expect("lookup")
        .expect("registered");
    assert_eq!(ticker.last_dividend_update, Some(at(NOW)));
}
