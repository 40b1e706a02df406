//! Runtime configuration read from the process environment.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `POLYGON_API_KEY` | unset | Provider credential |
//! | `DIVTICK_POLYGON_BASE_URL` | `https://api.polygon.io` | Provider base URL |
//! | `SUPABASE_URL` | unset | REST store base URL |
//! | `SUPABASE_ANON_KEY` | unset | REST store key |
//! | `DIVTICK_NORMALIZATION` | `coerce` | `coerce` or `reject` |
//! | `DIVTICK_TIMEOUT_MS` | `10000` | Per-request HTTP timeout |

use std::env;

use serde::Serialize;

use crate::normalize::NormalizationPolicy;
use crate::ValidationError;

pub const DEFAULT_POLYGON_BASE_URL: &str = "https://api.polygon.io";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Credentials and tunables for one engine instance.
#[derive(Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub polygon_api_key: Option<String>,
    pub polygon_base_url: String,
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub normalization: NormalizationPolicy,
    pub timeout_ms: u64,
}

// Keys are redacted so configs can be logged.
impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("polygon_api_key", &self.polygon_api_key.as_ref().map(|_| "<redacted>"))
            .field("polygon_base_url", &self.polygon_base_url)
            .field("supabase_url", &self.supabase_url)
            .field("supabase_key", &self.supabase_key.as_ref().map(|_| "<redacted>"))
            .field("normalization", &self.normalization)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            polygon_api_key: None,
            polygon_base_url: String::from(DEFAULT_POLYGON_BASE_URL),
            supabase_url: None,
            supabase_key: None,
            normalization: NormalizationPolicy::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let normalization = match read("DIVTICK_NORMALIZATION") {
            Some(value) => value.parse()?,
            None => NormalizationPolicy::default(),
        };

        // An unparsable timeout falls back to the default rather than failing startup.
        let timeout_ms = read("DIVTICK_TIMEOUT_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_TIMEOUT_MS);

        Ok(Self {
            polygon_api_key: read("POLYGON_API_KEY"),
            polygon_base_url: read("DIVTICK_POLYGON_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| String::from(DEFAULT_POLYGON_BASE_URL)),
            supabase_url: read("SUPABASE_URL").map(|url| url.trim_end_matches('/').to_owned()),
            supabase_key: read("SUPABASE_ANON_KEY"),
            normalization,
            timeout_ms,
        })
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            polygon_api_key: self.polygon_api_key.is_some(),
            supabase_url: self.supabase_url.is_some(),
            supabase_key: self.supabase_key.is_some(),
            normalization: self.normalization,
        }
    }
}

/// Which collaborators are configured. Never carries the secrets themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub polygon_api_key: bool,
    pub supabase_url: bool,
    pub supabase_key: bool,
    pub normalization: NormalizationPolicy,
}
