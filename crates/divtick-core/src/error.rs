use thiserror::Error;

/// Input that failed validation before any external call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC: '{value}'")]
    TimestampNotUtc { value: String },
    #[error("date must be YYYY-MM-DD: '{value}'")]
    InvalidDate { value: String },
    #[error("date arithmetic left the supported calendar range from '{value}'")]
    DateOutOfRange { value: String },

    #[error("invalid fetch mode '{value}', expected historical or incremental")]
    InvalidFetchMode { value: String },
    #[error("invalid normalization policy '{value}', expected coerce or reject")]
    InvalidNormalizationPolicy { value: String },

    #[error("invalid queue payload: {detail}")]
    InvalidQueuePayload { detail: String },
    #[error("unsupported message type '{value}'")]
    UnsupportedMessageType { value: String },

    #[error("ticker list cannot be empty")]
    EmptyTickerList,
    #[error("request_id cannot be empty")]
    InvalidRequestId,
}

/// Failure of one ingestion step. Every variant maps to a stable category code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("persistence operation '{operation}' failed: {detail}")]
    Persistence {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl IngestError {
    pub fn persistence(operation: &'static str, status: Option<u16>, detail: impl Into<String>) -> Self {
        Self::Persistence {
            operation,
            status,
            detail: detail.into(),
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::RateLimitExceeded(_) => "rate_limit_exceeded",
            Self::Upstream { .. } => "upstream_error",
            Self::Persistence { .. } => "persistence_error",
            Self::Validation(_) => "validation_error",
            Self::Transport(_) => "transport_error",
            Self::Decode(_) => "decode_error",
        }
    }
}
