//! Single-ticker ingestion: policy, fetch, normalize, store, timestamp.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::adapters::DividendSource;
use crate::clock::Clock;
use crate::date_range;
use crate::normalize::RecordNormalizer;
use crate::persistence::PersistenceGateway;
use crate::staleness::{self, StalenessReason};
use crate::{FetchMode, IngestError, Symbol};

/// Per-call knobs for one ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub force: bool,
    pub fetch_mode: FetchMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Processed,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DividendCounts {
    pub found: usize,
    pub stored: usize,
    pub errors: usize,
}

/// Error category and message attached to a failed result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultError {
    pub code: &'static str,
    pub message: String,
}

impl From<&IngestError> for ResultError {
    fn from(error: &IngestError) -> Self {
        Self {
            code: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingResult {
    /// Canonical symbol, or the raw input when it failed validation.
    pub ticker: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<StalenessReason>,
    pub dividends: DividendCounts,
    pub elapsed_ms: u64,
    pub fetch_mode: FetchMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
}

impl ProcessingResult {
    pub fn is_failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }
}

/// Drives one ticker through the full ingestion cycle. Never returns an error:
/// every failure becomes a [`Outcome::Failed`] result.
#[derive(Clone)]
pub struct IngestionOrchestrator {
    source: Arc<dyn DividendSource>,
    gateway: Arc<dyn PersistenceGateway>,
    normalizer: RecordNormalizer,
    clock: Arc<dyn Clock>,
}

struct Progress {
    reason: Option<StalenessReason>,
    counts: DividendCounts,
}

impl IngestionOrchestrator {
    pub fn new(
        source: Arc<dyn DividendSource>,
        gateway: Arc<dyn PersistenceGateway>,
        normalizer: RecordNormalizer,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            gateway,
            normalizer,
            clock,
        }
    }

    pub fn gateway(&self) -> &Arc<dyn PersistenceGateway> {
        &self.gateway
    }

    pub async fn process_ticker(&self, ticker: &str, options: ProcessOptions) -> ProcessingResult {
        let started = Instant::now();
        let mut progress = Progress {
            reason: None,
            counts: DividendCounts::default(),
        };

        let symbol = Symbol::parse(ticker);
        let display = symbol
            .as_ref()
            .map_or_else(|_| ticker.trim().to_owned(), |symbol| symbol.as_str().to_owned());

        let outcome = match symbol {
            Ok(symbol) => self.run(&symbol, options, &mut progress).await,
            Err(error) => Err(IngestError::from(error)),
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let result = ProcessingResult {
            ticker: display,
            outcome: match &outcome {
                Ok(outcome) => *outcome,
                Err(_) => Outcome::Failed,
            },
            reason: progress.reason,
            dividends: progress.counts,
            elapsed_ms,
            fetch_mode: options.fetch_mode,
            error: outcome.as_ref().err().map(ResultError::from),
        };

        match &outcome {
            Ok(Outcome::Skipped) => info!(
                ticker = %result.ticker,
                reason = result.reason.map_or("-", StalenessReason::as_str),
                "ticker skipped"
            ),
            Ok(_) => info!(
                ticker = %result.ticker,
                found = result.dividends.found,
                stored = result.dividends.stored,
                errors = result.dividends.errors,
                elapsed_ms,
                "ticker processed"
            ),
            Err(error @ IngestError::RateLimitExceeded(_)) => warn!(
                ticker = %result.ticker,
                error = %error,
                "ticker deferred by rate limit"
            ),
            Err(error) => error!(
                ticker = %result.ticker,
                code = error.kind(),
                error = %error,
                elapsed_ms,
                "ticker failed"
            ),
        }

        result
    }

    async fn run(
        &self,
        symbol: &Symbol,
        options: ProcessOptions,
        progress: &mut Progress,
    ) -> Result<Outcome, IngestError> {
        let stored_ticker = if options.force {
            None
        } else {
            self.gateway.get_ticker_info(symbol).await?
        };

        let now = self.clock.now();
        let decision = staleness::decide(stored_ticker.as_ref(), options.force, now);
        progress.reason = Some(decision.reason);
        if !decision.should_process {
            return Ok(Outcome::Skipped);
        }

        self.gateway.upsert_ticker(symbol).await?;

        let window = date_range::compute(options.fetch_mode, now.date())?;
        let raws = self.source.fetch(symbol, &window).await?;
        progress.counts.found = raws.len();

        let batch = self.normalizer.normalize_all(symbol, &raws, now);
        progress.counts.errors = batch.rejected.len();

        if !batch.records.is_empty() {
            let stored = self.gateway.store_dividends(symbol, &batch.records).await?;
            progress.counts.stored = stored.inserted;
            progress.counts.errors += stored.errors;
        }

        self.gateway.update_ticker_timestamp(symbol).await?;
        Ok(Outcome::Processed)
    }
}
