//! # Divtick Core
//!
//! Dividend ingestion engine: decides when a ticker needs fresh dividend data,
//! fetches it from Polygon under a fixed call quota, normalizes it and stores
//! it idempotently.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Market-data sources (Polygon reference dividends) |
//! | [`clock`] | Injectable time source |
//! | [`config`] | Environment configuration |
//! | [`date_range`] | Fetch windows per fetch mode |
//! | [`domain`] | Symbol, timestamps, ticker and dividend models |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Validation and ingestion errors |
//! | [`http_client`] | HTTP client abstraction |
//! | [`normalize`] | Provider record normalization |
//! | [`orchestrator`] | Single-ticker ingestion |
//! | [`persistence`] | REST and DuckDB storage gateways |
//! | [`provider_policy`] | Provider quota terms |
//! | [`queue`] | Queue message consumer |
//! | [`scheduler`] | Paced sequential batches |
//! | [`staleness`] | 24-hour staleness rule |
//! | [`throttling`] | Shared rate budget |
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ CLI / QueueConsumer  │
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐     ┌──────────────────┐
//! │   BatchScheduler     │────▶│   RateBudget     │
//! └──────────┬───────────┘     └────────▲─────────┘
//!            ▼                          │
//! ┌──────────────────────┐     ┌────────┴─────────┐
//! │ IngestionOrchestrator│────▶│ DividendSource   │
//! └──────────┬───────────┘     └──────────────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ PersistenceGateway   │
//! │ (REST / warehouse)   │
//! └──────────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Per-ticker failures never escape the orchestrator; they are reported as
//! failed results carrying a stable category code:
//!
//! ```rust
//! use divtick_core::IngestError;
//!
//! let error = IngestError::RateLimitExceeded(String::from("quota used"));
//! assert_eq!(error.kind(), "rate_limit_exceeded");
//! ```
//!
//! ## Security
//!
//! - API keys are read from environment variables only and never logged
//! - Symbols are validated before they reach any URL

pub mod adapters;
pub mod clock;
pub mod config;
pub mod date_range;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod normalize;
pub mod orchestrator;
pub mod persistence;
pub mod provider_policy;
pub mod queue;
pub mod scheduler;
pub mod staleness;
pub mod throttling;

pub use adapters::{DividendSource, PolygonDividendSource};

pub use clock::{Clock, FixedClock, SystemClock};

pub use config::{Capabilities, IngestConfig};

pub use date_range::FetchWindow;

pub use domain::{DividendQuery, DividendRecord, FetchMode, Symbol, Ticker, UtcDateTime};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

pub use error::{IngestError, ValidationError};

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

pub use normalize::{NormalizationPolicy, RawDividend, RecordNormalizer, RejectedRecord};

pub use orchestrator::{
    DividendCounts, IngestionOrchestrator, Outcome, ProcessOptions, ProcessingResult, ResultError,
};

pub use persistence::{PersistenceGateway, RestGateway, StoreOutcome, WarehouseGateway};

pub use provider_policy::ProviderPolicy;

pub use queue::{
    Disposition, InboundMessage, MessageOutcome, QueueConsumer, QueueMessage, QueuePayload,
};

pub use scheduler::{BatchResult, BatchScheduler, BatchSummary, Pacer, TokioPacer};

pub use staleness::{StalenessDecision, StalenessReason};

pub use throttling::{RateBudget, RateLimitState};

// Warehouse (re-exported from divtick-warehouse)
pub use divtick_warehouse::{Warehouse, WarehouseConfig, WarehouseError};
