//! Queue message handling for asynchronous ticker ingestion.
//!
//! Wire body (camelCase):
//!
//! ```json
//! {"type": "new_ticker_processing", "tickers": ["AAPL", "KO"], "requestId": "r-1"}
//! ```
//!
//! `force` and `fetchMode` are accepted on the wire but new-ticker messages
//! always run forced and historical.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::orchestrator::ProcessOptions;
use crate::scheduler::{BatchResult, BatchScheduler};
use crate::{FetchMode, ValidationError};

pub const NEW_TICKER_PROCESSING: &str = "new_ticker_processing";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    #[serde(rename = "type")]
    pub message_type: String,
    pub tickers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl QueuePayload {
    pub fn new_ticker_processing(tickers: Vec<String>) -> Self {
        Self {
            message_type: String::from(NEW_TICKER_PROCESSING),
            tickers,
            force: None,
            fetch_mode: None,
            request_id: None,
        }
    }
}

pub fn decode_payload(body: &Value) -> Result<QueuePayload, ValidationError> {
    QueuePayload::deserialize(body).map_err(|error| ValidationError::InvalidQueuePayload {
        detail: error.to_string(),
    })
}

/// A queue body sorted by its `type` before the rest of it is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    NewTickers(QueuePayload),
    /// Any other type; its remaining fields are never inspected.
    Other(String),
}

/// Read `type` first so unknown types are recognized whatever else the body
/// carries. Only `new_ticker_processing` bodies must decode as a full payload.
pub fn classify(body: &Value) -> Result<InboundMessage, ValidationError> {
    let message_type = body
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::InvalidQueuePayload {
            detail: String::from("missing string field `type`"),
        })?;

    if message_type != NEW_TICKER_PROCESSING {
        return Ok(InboundMessage::Other(message_type.to_owned()));
    }
    decode_payload(body).map(InboundMessage::NewTickers)
}

/// One delivered message as the queue host hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub id: String,
    pub body: Value,
    #[serde(default = "first_attempt")]
    pub attempts: u32,
}

const fn first_attempt() -> u32 {
    1
}

impl QueueMessage {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
            attempts: first_attempt(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Ack,
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageOutcome {
    pub id: String,
    pub disposition: Disposition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Maps queue messages onto batch runs and ack/retry decisions.
#[derive(Clone)]
pub struct QueueConsumer {
    scheduler: BatchScheduler,
}

impl QueueConsumer {
    pub fn new(scheduler: BatchScheduler) -> Self {
        Self { scheduler }
    }

    /// Handle every message in delivery order.
    pub async fn consume(&self, messages: &[QueueMessage]) -> Vec<MessageOutcome> {
        let mut outcomes = Vec::with_capacity(messages.len());
        for message in messages {
            outcomes.push(self.handle(message).await);
        }
        outcomes
    }

    pub async fn handle(&self, message: &QueueMessage) -> MessageOutcome {
        let payload = match classify(&message.body) {
            Ok(InboundMessage::NewTickers(payload)) => payload,
            Ok(InboundMessage::Other(message_type)) => {
                warn!(
                    message_id = %message.id,
                    message_type = %message_type,
                    "unknown queue message type dropped"
                );
                return MessageOutcome {
                    id: message.id.clone(),
                    disposition: Disposition::Ack,
                    batch: None,
                    error: None,
                };
            }
            Err(error) => {
                warn!(
                    message_id = %message.id,
                    attempts = message.attempts,
                    error = %error,
                    "undecodable queue message marked for retry"
                );
                return MessageOutcome {
                    id: message.id.clone(),
                    disposition: Disposition::Retry,
                    batch: None,
                    error: Some(error.to_string()),
                };
            }
        };

        let batch = self.run_new_tickers(&payload).await;
        info!(
            message_id = %message.id,
            request_id = payload.request_id.as_deref().unwrap_or("-"),
            tickers = batch.total_tickers,
            "queue message processed"
        );

        MessageOutcome {
            id: message.id.clone(),
            disposition: Disposition::Ack,
            batch: Some(batch),
            error: None,
        }
    }

    /// Inline single-message path. Unknown types and empty ticker lists are
    /// errors here instead of being dropped.
    pub async fn dispatch(&self, body: &Value) -> Result<BatchResult, ValidationError> {
        let payload = match classify(body)? {
            InboundMessage::NewTickers(payload) => payload,
            InboundMessage::Other(value) => {
                return Err(ValidationError::UnsupportedMessageType { value });
            }
        };
        if payload.tickers.is_empty() {
            return Err(ValidationError::EmptyTickerList);
        }
        Ok(self.run_new_tickers(&payload).await)
    }

    async fn run_new_tickers(&self, payload: &QueuePayload) -> BatchResult {
        let options = ProcessOptions {
            force: true,
            fetch_mode: FetchMode::Historical,
        };
        self.scheduler
            .process_batch(payload.tickers.as_slice(), options)
            .await
    }
}
