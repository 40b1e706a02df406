use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Symbol, UtcDateTime, ValidationError};

/// How far back and forward a fetch reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    #[default]
    Historical,
    Incremental,
}

impl FetchMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Historical => "historical",
            Self::Incremental => "incremental",
        }
    }
}

impl Display for FetchMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMode {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "historical" => Ok(Self::Historical),
            "incremental" => Ok(Self::Incremental),
            _ => Err(ValidationError::InvalidFetchMode {
                value: value.to_owned(),
            }),
        }
    }
}

/// A tracked ticker as the persistence layer reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: Symbol,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<UtcDateTime>,
    #[serde(default)]
    pub last_dividend_update: Option<UtcDateTime>,
    #[serde(default)]
    pub last_polygon_call: Option<UtcDateTime>,
}

const fn default_active() -> bool {
    true
}

impl Ticker {
    pub fn new(symbol: Symbol, created_at: UtcDateTime) -> Self {
        Self {
            symbol,
            is_active: true,
            created_at: Some(created_at),
            last_dividend_update: None,
            last_polygon_call: None,
        }
    }
}

/// Canonical dividend event. Dates are `YYYY-MM-DD` text carried as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendRecord {
    pub ticker: Symbol,
    pub declaration_date: Option<String>,
    pub record_date: Option<String>,
    pub ex_dividend_date: String,
    pub pay_date: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub frequency: u32,
    #[serde(rename = "type")]
    pub dividend_type: String,
    pub polygon_id: Option<String>,
    pub data_source: String,
    pub created_at: UtcDateTime,
}

impl DividendRecord {
    /// Key used for idempotent storage within one ticker.
    pub fn storage_key(&self) -> String {
        match &self.polygon_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("ex:{}:{}", self.ex_dividend_date, self.amount),
        }
    }
}

/// Read filter for stored dividends. Date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DividendQuery {
    pub ticker: Option<Symbol>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl DividendQuery {
    pub fn for_ticker(ticker: Symbol) -> Self {
        Self {
            ticker: Some(ticker),
            ..Self::default()
        }
    }
}
