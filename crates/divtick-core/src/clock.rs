use std::sync::Mutex;

use time::Duration;

use crate::UtcDateTime;

/// Source of "now" for staleness decisions and persisted timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

/// Manually driven clock for deterministic tests.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<UtcDateTime>,
}

impl FixedClock {
    pub fn new(now: UtcDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: UtcDateTime) {
        *self.now.lock().expect("fixed clock lock is not poisoned") = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("fixed clock lock is not poisoned");
        if let Some(next) = now.checked_add(by) {
            *now = next;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> UtcDateTime {
        *self.now.lock().expect("fixed clock lock is not poisoned")
    }
}
