//! Sliding-window request limiter keyed by an identifier string.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use log::warn;

/// Time source for the limiter.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    clock: Box<dyn Clock>,
    requests: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration, clock: impl Clock + 'static) -> Self {
        RateLimiter {
            limit,
            window,
            clock: Box::new(clock),
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// `limit` requests per rolling minute on the system clock.
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::minutes(1), SystemClock)
    }

    fn requests(&self) -> MutexGuard<'_, HashMap<String, VecDeque<DateTime<Utc>>>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn prune(window: &mut VecDeque<DateTime<Utc>>, cutoff: DateTime<Utc>) {
        while window.front().is_some_and(|t| *t <= cutoff) {
            window.pop_front();
        }
    }

    /// Records a request for `identifier` and returns true, or returns false
    /// without recording anything when the window is already full.
    pub fn check(&self, identifier: &str) -> bool {
        let now = self.clock.now();
        let mut requests = self.requests();
        let window = requests.entry(identifier.to_string()).or_default();
        Self::prune(window, now - self.window);

        if window.len() >= self.limit {
            warn!(
                "[RATE] Limit of {} per {}s reached for '{}'",
                self.limit,
                self.window.num_seconds(),
                identifier
            );
            return false;
        }

        window.push_back(now);
        true
    }

    /// Free slots left for `identifier` in the current window.
    pub fn remaining(&self, identifier: &str) -> usize {
        let now = self.clock.now();
        let mut requests = self.requests();
        match requests.get_mut(identifier) {
            Some(window) => {
                Self::prune(window, now - self.window);
                self.limit.saturating_sub(window.len())
            }
            None => self.limit,
        }
    }
}
