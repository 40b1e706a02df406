use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::provider_policy::ProviderPolicy;

/// Counter state of one fixed quota window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitState {
    pub call_count: u32,
    pub window_start: Option<Instant>,
}

/// Fixed-window call budget shared by the fetcher and the batch scheduler.
///
/// Admission never waits: an exhausted budget is reported immediately with the
/// time left in the current window. State is process-local.
#[derive(Debug)]
pub struct RateBudget {
    quota_window: Duration,
    quota_limit: u32,
    state: Mutex<RateLimitState>,
}

impl RateBudget {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            quota_window,
            quota_limit: quota_limit.max(1),
            state: Mutex::new(RateLimitState::default()),
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.quota_window, policy.quota_limit)
    }

    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.try_acquire_at(Instant::now())
    }

    /// Count one call at `now`, or return how long until the window resets.
    pub fn try_acquire_at(&self, now: Instant) -> Result<(), Duration> {
        let mut state = self
            .state
            .lock()
            .expect("rate budget lock is not poisoned");

        match state.window_start {
            Some(start) if now.saturating_duration_since(start) < self.quota_window => {
                if state.call_count >= self.quota_limit {
                    let elapsed = now.saturating_duration_since(start);
                    return Err(self.quota_window.saturating_sub(elapsed));
                }
                state.call_count += 1;
            }
            _ => {
                state.window_start = Some(now);
                state.call_count = 1;
            }
        }

        Ok(())
    }

    /// Pause between consecutive calls that keeps a sequential caller inside the quota.
    pub fn pacing_interval(&self) -> Duration {
        self.quota_window / self.quota_limit
    }

    pub fn quota_limit(&self) -> u32 {
        self.quota_limit
    }

    pub fn quota_window(&self) -> Duration {
        self.quota_window
    }

    pub fn snapshot(&self) -> RateLimitState {
        *self
            .state
            .lock()
            .expect("rate budget lock is not poisoned")
    }
}

impl Default for RateBudget {
    fn default() -> Self {
        Self::from_policy(&ProviderPolicy::polygon_free_tier())
    }
}
