use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::adapters::DividendSource;
use crate::config::IngestConfig;
use crate::date_range::FetchWindow;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::normalize::RawDividend;
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateBudget;
use crate::{IngestError, Symbol};

const DIVIDENDS_PATH: &str = "/v3/reference/dividends";

/// Polygon reference-dividends client guarded by a shared [`RateBudget`].
#[derive(Clone)]
pub struct PolygonDividendSource {
    http_client: Arc<dyn HttpClient>,
    budget: Arc<RateBudget>,
    api_key: Option<String>,
    base_url: String,
    timeout_ms: u64,
    page_size: u32,
}

#[derive(Debug, Deserialize)]
struct DividendsResponse {
    #[serde(default)]
    results: Vec<RawDividend>,
}

impl PolygonDividendSource {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        budget: Arc<RateBudget>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            http_client,
            budget,
            api_key: config.polygon_api_key.clone(),
            base_url: config.polygon_base_url.clone(),
            timeout_ms: config.timeout_ms,
            page_size: ProviderPolicy::polygon_free_tier().max_results,
        }
    }

    pub fn dividends_url(&self, symbol: &Symbol, window: &FetchWindow) -> String {
        format!(
            "{}{}?ticker={}&ex_dividend_date.gte={}&ex_dividend_date.lte={}&limit={}",
            self.base_url,
            DIVIDENDS_PATH,
            urlencoding::encode(symbol.as_str()),
            window.start_str(),
            window.end_str(),
            self.page_size,
        )
    }

    async fn fetch_dividends(
        &self,
        symbol: &Symbol,
        window: &FetchWindow,
    ) -> Result<Vec<RawDividend>, IngestError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(IngestError::Config(String::from(
                "POLYGON_API_KEY is not configured",
            )));
        };

        if let Err(wait) = self.budget.try_acquire() {
            warn!(
                ticker = %symbol,
                retry_after_secs = wait.as_secs(),
                "local polygon rate budget exhausted"
            );
            return Err(IngestError::RateLimitExceeded(format!(
                "polygon quota of {} calls per {}s used; window resets in {}s",
                self.budget.quota_limit(),
                self.budget.quota_window().as_secs(),
                wait.as_secs()
            )));
        }

        let url = self.dividends_url(symbol, window);
        debug!(
            ticker = %symbol,
            start = %window.start_str(),
            end = %window.end_str(),
            mode = %window.mode,
            "requesting polygon dividends"
        );

        let request = HttpRequest::get(url)
            .with_header("accept", "application/json")
            .with_auth(&HttpAuth::BearerToken(api_key.to_owned()))
            .with_timeout_ms(self.timeout_ms);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| IngestError::Transport(format!("polygon: {}", error.message())))?;

        if response.status == 429 {
            warn!(ticker = %symbol, "polygon answered 429");
            return Err(IngestError::RateLimitExceeded(String::from(
                "polygon responded with HTTP 429",
            )));
        }

        if !response.is_success() {
            return Err(IngestError::Upstream {
                status: response.status,
                body: response.body,
            });
        }

        let parsed: DividendsResponse = serde_json::from_str(&response.body)
            .map_err(|error| IngestError::Decode(format!("polygon dividends payload: {error}")))?;

        debug!(ticker = %symbol, count = parsed.results.len(), "polygon dividends received");
        Ok(parsed.results)
    }
}

impl DividendSource for PolygonDividendSource {
    fn source_tag(&self) -> &'static str {
        "polygon"
    }

    fn fetch<'a>(
        &'a self,
        symbol: &'a Symbol,
        window: &'a FetchWindow,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RawDividend>, IngestError>> + Send + 'a>> {
        Box::pin(self.fetch_dividends(symbol, window))
    }
}
