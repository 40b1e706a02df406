use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::orchestrator::{IngestionOrchestrator, Outcome, ProcessOptions, ProcessingResult};
use crate::throttling::RateBudget;

/// Suspends the batch between tickers.
pub trait Pacer: Send + Sync {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Real-time pacing on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

impl Pacer for TokioPacer {
    fn pause<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub total_tickers: usize,
    pub summary: BatchSummary,
    pub results: Vec<ProcessingResult>,
}

impl BatchResult {
    pub fn from_results(results: Vec<ProcessingResult>) -> Self {
        let mut summary = BatchSummary::default();
        for result in &results {
            match result.outcome {
                Outcome::Processed => summary.successful += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }

        Self {
            total_tickers: results.len(),
            summary,
            results,
        }
    }
}

/// Runs tickers one at a time, pausing between them so a sequential batch
/// stays inside the provider quota.
#[derive(Clone)]
pub struct BatchScheduler {
    orchestrator: IngestionOrchestrator,
    budget: Arc<RateBudget>,
    pacer: Arc<dyn Pacer>,
}

impl BatchScheduler {
    pub fn new(
        orchestrator: IngestionOrchestrator,
        budget: Arc<RateBudget>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            orchestrator,
            budget,
            pacer,
        }
    }

    pub fn orchestrator(&self) -> &IngestionOrchestrator {
        &self.orchestrator
    }

    pub async fn process_batch<S>(&self, tickers: &[S], options: ProcessOptions) -> BatchResult
    where
        S: AsRef<str> + Sync,
    {
        let interval = self.budget.pacing_interval();
        let mut results = Vec::with_capacity(tickers.len());

        for (index, ticker) in tickers.iter().enumerate() {
            if index > 0 {
                debug!(pause_ms = interval.as_millis() as u64, "pacing before next ticker");
                self.pacer.pause(interval).await;
            }
            results.push(self.orchestrator.process_ticker(ticker.as_ref(), options).await);
        }

        let batch = BatchResult::from_results(results);
        info!(
            total = batch.total_tickers,
            successful = batch.summary.successful,
            failed = batch.summary.failed,
            skipped = batch.summary.skipped,
            "batch complete"
        );
        batch
    }
}
