use std::time::Duration;

/// Quota terms a provider imposes on one API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub provider: &'static str,
    pub quota_window: Duration,
    pub quota_limit: u32,
    /// Page size requested per call.
    pub max_results: u32,
}

impl ProviderPolicy {
    /// Polygon free tier: 5 calls per minute.
    pub const fn polygon_free_tier() -> Self {
        Self {
            provider: "polygon",
            quota_window: Duration::from_secs(60),
            quota_limit: 5,
            max_results: 1_000,
        }
    }
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self::polygon_free_tier()
    }
}
