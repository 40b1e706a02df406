//! Provider record to canonical [`DividendRecord`] mapping.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::parse_date;
use crate::{DividendRecord, Symbol, UtcDateTime, ValidationError};

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_FREQUENCY: u32 = 4;
pub const DEFAULT_DIVIDEND_TYPE: &str = "Cash";

/// One entry of the provider's `results` array, loosely typed so a single
/// odd entry is rejected on its own instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDividend {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub ticker: Option<Value>,
    #[serde(default)]
    pub cash_amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<Value>,
    #[serde(default)]
    pub declaration_date: Option<Value>,
    #[serde(default)]
    pub ex_dividend_date: Option<Value>,
    #[serde(default)]
    pub pay_date: Option<Value>,
    #[serde(default)]
    pub record_date: Option<Value>,
    #[serde(default)]
    pub frequency: Option<Value>,
    #[serde(default)]
    pub dividend_type: Option<Value>,
}

/// How strictly malformed provider fields are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationPolicy {
    /// Substitute defaults for unusable fields.
    #[default]
    Coerce,
    /// Drop records with an unparsable amount or malformed date.
    Reject,
}

impl Display for NormalizationPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Coerce => "coerce",
            Self::Reject => "reject",
        })
    }
}

impl FromStr for NormalizationPolicy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "coerce" => Ok(Self::Coerce),
            "reject" => Ok(Self::Reject),
            _ => Err(ValidationError::InvalidNormalizationPolicy {
                value: value.to_owned(),
            }),
        }
    }
}

/// A raw entry that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRecord {
    pub provider_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<DividendRecord>,
    pub rejected: Vec<RejectedRecord>,
}

#[derive(Debug, Clone)]
pub struct RecordNormalizer {
    policy: NormalizationPolicy,
    source_tag: &'static str,
}

impl Default for RecordNormalizer {
    fn default() -> Self {
        Self::new(NormalizationPolicy::default(), "polygon")
    }
}

impl RecordNormalizer {
    pub fn new(policy: NormalizationPolicy, source_tag: &'static str) -> Self {
        Self { policy, source_tag }
    }

    pub fn policy(&self) -> NormalizationPolicy {
        self.policy
    }

    pub fn normalize(
        &self,
        ticker: &Symbol,
        raw: &RawDividend,
        created_at: UtcDateTime,
    ) -> Result<DividendRecord, RejectedRecord> {
        let provider_id = text(&raw.id);
        let reject = |reason: String| RejectedRecord {
            provider_id: provider_id.clone(),
            reason,
        };

        let ex_dividend_date = match &raw.ex_dividend_date {
            None | Some(Value::Null) => None,
            Some(Value::String(value)) => Some(value.as_str()),
            Some(other) => return Err(reject(format!("malformed ex_dividend_date {other}"))),
        }
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| reject(String::from("missing ex_dividend_date")))?;

        let optional_date = |field: &str, value: &Option<Value>| match date_text(value) {
            Ok(text) => Ok(text),
            Err(other) if self.policy == NormalizationPolicy::Reject => {
                Err(reject(format!("malformed {field} {other}")))
            }
            Err(_) => Ok(None),
        };
        let declaration_date = optional_date("declaration_date", &raw.declaration_date)?;
        let record_date = optional_date("record_date", &raw.record_date)?;
        let pay_date = optional_date("pay_date", &raw.pay_date)?;

        let amount = parse_amount(raw.cash_amount.as_ref());

        if self.policy == NormalizationPolicy::Reject {
            if amount.is_none() {
                return Err(reject(format!(
                    "unparsable cash_amount {}",
                    raw.cash_amount
                        .as_ref()
                        .map_or_else(|| String::from("<missing>"), Value::to_string)
                )));
            }

            let dates = [
                ("ex_dividend_date", Some(&ex_dividend_date)),
                ("declaration_date", declaration_date.as_ref()),
                ("record_date", record_date.as_ref()),
                ("pay_date", pay_date.as_ref()),
            ];
            for (field, value) in dates {
                if let Some(value) = value {
                    if parse_date(value).is_err() {
                        return Err(reject(format!("malformed {field} '{value}'")));
                    }
                }
            }
        }

        Ok(DividendRecord {
            ticker: ticker.clone(),
            declaration_date,
            record_date,
            ex_dividend_date,
            pay_date,
            amount: amount.unwrap_or(0.0),
            currency: text(&raw.currency).unwrap_or_else(|| String::from(DEFAULT_CURRENCY)),
            frequency: parse_frequency(raw.frequency.as_ref()).unwrap_or(DEFAULT_FREQUENCY),
            dividend_type: text(&raw.dividend_type)
                .unwrap_or_else(|| String::from(DEFAULT_DIVIDEND_TYPE)),
            polygon_id: provider_id,
            data_source: self.source_tag.to_owned(),
            created_at,
        })
    }

    /// Normalize every entry, logging and collecting the ones that fail.
    pub fn normalize_all(
        &self,
        ticker: &Symbol,
        raws: &[RawDividend],
        created_at: UtcDateTime,
    ) -> NormalizedBatch {
        let mut batch = NormalizedBatch::default();
        for raw in raws {
            match self.normalize(ticker, raw, created_at) {
                Ok(record) => batch.records.push(record),
                Err(rejected) => {
                    warn!(
                        ticker = %ticker,
                        provider_id = rejected.provider_id.as_deref().unwrap_or("-"),
                        reason = %rejected.reason,
                        "dividend record rejected"
                    );
                    batch.rejected.push(rejected);
                }
            }
        }
        batch
    }
}

// Numbers are accepted for identifiers and labels.
fn text(value: &Option<Value>) -> Option<String> {
    match value.as_ref()? {
        Value::String(text) => Some(text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_owned),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// A non-string date comes back as `Err` with its JSON rendering.
fn date_text(value: &Option<Value>) -> Result<Option<String>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.trim())
            .filter(|text| !text.is_empty())
            .map(str::to_owned)),
        Some(other) => Err(other.to_string()),
    }
}

fn parse_amount(value: Option<&Value>) -> Option<f64> {
    let amount = match value? {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    amount.is_finite().then_some(amount)
}

// Zero counts as missing.
fn parse_frequency(value: Option<&Value>) -> Option<u32> {
    let frequency = match value? {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => text.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(frequency).ok().filter(|frequency| *frequency > 0)
}
