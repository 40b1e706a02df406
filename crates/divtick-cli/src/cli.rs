//! CLI argument definitions for divtick.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `process` | Ingest dividends for one or more tickers |
//! | `refresh` | Re-check every active ticker (skips fresh ones) |
//! | `queue send` | Dispatch one queue payload inline |
//! | `queue consume` | Drain an NDJSON file of queue messages |
//! | `dividends` | Read stored dividends |
//! | `health` | Report configured collaborators |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--backend` | `warehouse` | Storage backend (rest, warehouse) |
//! | `--format` | `json` | Output format (json, csv) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! divtick process AAPL KO --force
//! divtick refresh --fetch-mode incremental
//! divtick queue send '{"type":"new_ticker_processing","tickers":["MSFT"]}'
//! divtick dividends KO --start-date 2024-01-01 --format csv
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use divtick_core::FetchMode;

/// Dividend ingestion engine for Polygon reference data.
#[derive(Debug, Parser)]
#[command(name = "divtick", author, version, about = "Dividend ingestion engine")]
pub struct Cli {
    /// Storage backend for tickers and dividends.
    #[arg(long, global = true, value_enum, default_value_t = Backend::Warehouse)]
    pub backend: Backend,

    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// PostgREST endpoint configured by SUPABASE_URL / SUPABASE_ANON_KEY.
    Rest,
    /// Local DuckDB file under DIVTICK_HOME.
    Warehouse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    /// Comma-separated rows (dividends only).
    Csv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchModeArg {
    /// Two years back, six months forward.
    Historical,
    /// Two days back, three months forward.
    Incremental,
}

impl From<FetchModeArg> for FetchMode {
    fn from(value: FetchModeArg) -> Self {
        match value {
            FetchModeArg::Historical => Self::Historical,
            FetchModeArg::Incremental => Self::Incremental,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest dividends for the given tickers, one at a time.
    ///
    ///   divtick process AAPL
    ///   divtick process AAPL MSFT KO --fetch-mode incremental
    Process(ProcessArgs),

    /// Run every active ticker through the staleness check.
    Refresh(RefreshArgs),

    /// Queue message handling.
    Queue(QueueArgs),

    /// Read stored dividends, newest ex-dividend date first.
    ///
    ///   divtick dividends KO --limit 8
    ///   divtick dividends all --start-date 2024-01-01 --format csv
    Dividends(DividendsArgs),

    /// Report which credentials and backends are configured.
    Health,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    #[arg(required = true, num_args = 1..)]
    pub tickers: Vec<String>,

    /// Ignore the 24-hour staleness check.
    #[arg(long, default_value_t = false)]
    pub force: bool,

    #[arg(long, value_enum, default_value_t = FetchModeArg::Historical)]
    pub fetch_mode: FetchModeArg,
}

#[derive(Debug, Args)]
pub struct RefreshArgs {
    #[arg(long, value_enum, default_value_t = FetchModeArg::Incremental)]
    pub fetch_mode: FetchModeArg,
}

#[derive(Debug, Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommand,
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Process one JSON payload immediately.
    Send {
        /// Payload such as '{"type":"new_ticker_processing","tickers":["AAPL"]}'.
        payload: String,
    },
    /// Consume `{"id":..,"body":..}` messages, one per line.
    Consume {
        file: PathBuf,

        /// Deliveries per message before it is dead-lettered.
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,
    },
}

#[derive(Debug, Args)]
pub struct DividendsArgs {
    /// Ticker symbol, or `all`.
    pub ticker: String,

    /// Earliest ex-dividend date (YYYY-MM-DD).
    #[arg(long)]
    pub start_date: Option<String>,

    /// Latest ex-dividend date (YYYY-MM-DD).
    #[arg(long)]
    pub end_date: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub offset: Option<usize>,
}
