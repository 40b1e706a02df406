use serde::{Deserialize, Serialize};

use crate::{IngestError, UtcDateTime, ValidationError};

/// Standard wrapper for every `divtick` machine-readable output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    pub fn success(meta: EnvelopeMeta, data: T) -> Self {
        Self {
            success: true,
            meta,
            data,
            errors: Vec::new(),
        }
    }

    /// An envelope is successful only while it carries no errors.
    pub fn with_errors(meta: EnvelopeMeta, data: T, errors: Vec<EnvelopeError>) -> Self {
        Self {
            success: errors.is_empty(),
            meta,
            data,
            errors,
        }
    }

    pub fn push_error(&mut self, error: EnvelopeError) {
        self.errors.push(error);
        self.success = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub generated_at: UtcDateTime,
    pub latency_ms: u64,
}

impl EnvelopeMeta {
    pub fn new(request_id: impl Into<String>, latency_ms: u64) -> Result<Self, ValidationError> {
        let request_id = request_id.into();
        if request_id.trim().is_empty() {
            return Err(ValidationError::InvalidRequestId);
        }

        Ok(Self {
            request_id,
            generated_at: UtcDateTime::now(),
            latency_ms,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&IngestError> for EnvelopeError {
    fn from(error: &IngestError) -> Self {
        Self::new(error.kind(), error.to_string())
    }
}
