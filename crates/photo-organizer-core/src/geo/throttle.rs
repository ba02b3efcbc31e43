use std::time::{Duration, Instant};

/// Enforces a minimum gap between the *starts* of consecutive requests,
/// regardless of how long each request takes.
///
/// Owned by whichever client issues the requests; there is no global state.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_start: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: None,
        }
    }

    /// Start time of the most recent request, if any.
    pub fn last_start(&self) -> Option<Instant> {
        self.last_start
    }

    /// Block until the next request may start, then record that start.
    /// Returns how long it slept.
    pub fn acquire(&mut self) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(last) = self.last_start {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                waited = self.min_interval - elapsed;
                std::thread::sleep(waited);
            }
        }
        self.last_start = Some(Instant::now());
        waited
    }
}
