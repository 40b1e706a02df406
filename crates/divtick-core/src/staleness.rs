//! Decides whether a ticker needs (re)ingestion.

use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{Ticker, UtcDateTime};

/// Data older than this is refetched.
pub const STALENESS_THRESHOLD: Duration = Duration::hours(24);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessReason {
    ForceUpdate,
    NewTicker,
    NoDividendData,
    StaleData,
    RecentData,
}

impl StalenessReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ForceUpdate => "force_update",
            Self::NewTicker => "new_ticker",
            Self::NoDividendData => "no_dividend_data",
            Self::StaleData => "stale_data",
            Self::RecentData => "recent_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StalenessDecision {
    pub should_process: bool,
    pub reason: StalenessReason,
}

impl StalenessDecision {
    const fn process(reason: StalenessReason) -> Self {
        Self {
            should_process: true,
            reason,
        }
    }
}

/// Pure staleness rule. `ticker` is the stored row, if any.
pub fn decide(ticker: Option<&Ticker>, force: bool, now: UtcDateTime) -> StalenessDecision {
    if force {
        return StalenessDecision::process(StalenessReason::ForceUpdate);
    }

    let Some(ticker) = ticker else {
        return StalenessDecision::process(StalenessReason::NewTicker);
    };

    let Some(last_update) = ticker.last_dividend_update else {
        return StalenessDecision::process(StalenessReason::NoDividendData);
    };

    // A threshold before the representable range means nothing can be stale.
    let is_stale = now
        .checked_sub(STALENESS_THRESHOLD)
        .is_some_and(|threshold| last_update < threshold);

    if is_stale {
        StalenessDecision::process(StalenessReason::StaleData)
    } else {
        StalenessDecision {
            should_process: false,
            reason: StalenessReason::RecentData,
        }
    }
}
