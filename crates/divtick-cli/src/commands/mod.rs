mod dividends;
mod health;
mod process;
mod queue;
mod refresh;

use std::sync::Arc;
use std::time::Instant;

use divtick_core::{
    BatchScheduler, Clock, DividendRecord, DividendSource, EnvelopeError, HttpClient, IngestConfig,
    IngestionOrchestrator, PersistenceGateway, PolygonDividendSource, ProcessingResult,
    ProviderPolicy, RateBudget, RecordNormalizer, ReqwestHttpClient, RestGateway, SystemClock,
    TokioPacer, Warehouse, WarehouseGateway,
};
use serde_json::Value;

use crate::cli::{Backend, Cli, Command, QueueCommand};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    /// Rows for tabular output, when the command has them.
    pub rows: Option<Vec<DividendRecord>>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
            latency_ms: 0,
            rows: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_rows(mut self, rows: Vec<DividendRecord>) -> Self {
        self.rows = Some(rows);
        self
    }
}

/// Wired ingestion stack for one CLI invocation.
pub struct Engine {
    pub gateway: Arc<dyn PersistenceGateway>,
    pub scheduler: BatchScheduler,
}

impl Engine {
    pub fn build(backend: Backend, config: &IngestConfig) -> Result<Self, CliError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let http_client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

        let gateway: Arc<dyn PersistenceGateway> = match backend {
            Backend::Rest => Arc::new(RestGateway::new(
                Arc::clone(&http_client),
                Arc::clone(&clock),
                config,
            )?),
            Backend::Warehouse => Arc::new(WarehouseGateway::new(
                Warehouse::open_default()?,
                Arc::clone(&clock),
            )),
        };

        let budget = Arc::new(RateBudget::from_policy(&ProviderPolicy::polygon_free_tier()));
        let source = Arc::new(PolygonDividendSource::new(
            http_client,
            Arc::clone(&budget),
            config,
        ));
        let normalizer = RecordNormalizer::new(config.normalization, source.source_tag());
        let orchestrator =
            IngestionOrchestrator::new(source, Arc::clone(&gateway), normalizer, clock);

        Ok(Self {
            gateway,
            scheduler: BatchScheduler::new(orchestrator, budget, Arc::new(TokioPacer)),
        })
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let config = IngestConfig::from_env()?;

    let mut result = match &cli.command {
        Command::Health => health::run(cli.backend, &config)?,
        Command::Process(args) => process::run(args, &Engine::build(cli.backend, &config)?).await?,
        Command::Refresh(args) => refresh::run(args, &Engine::build(cli.backend, &config)?).await?,
        Command::Queue(args) => {
            let engine = Engine::build(cli.backend, &config)?;
            match &args.command {
                QueueCommand::Send { payload } => queue::send(payload, &engine).await?,
                QueueCommand::Consume { file, max_attempts } => {
                    queue::consume(file, *max_attempts, &engine).await?
                }
            }
        }
        Command::Dividends(args) => {
            dividends::run(args, &Engine::build(cli.backend, &config)?).await?
        }
    };

    result.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(result)
}

/// Envelope errors for every failed ticker in `results`.
pub(crate) fn failure_errors(results: &[ProcessingResult]) -> Vec<EnvelopeError> {
    results
        .iter()
        .filter_map(|result| {
            result.error.as_ref().map(|error| {
                EnvelopeError::new(error.code, format!("{}: {}", result.ticker, error.message))
            })
        })
        .collect()
}
