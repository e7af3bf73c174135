use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("⏳ Please wait {wait_secs} seconds before generating again.")]
    TooSoon { wait_secs: u64 },
}

/// Minimum-interval guard between provider calls.
///
/// Only the last accepted call is remembered, so there is nothing to queue:
/// a request either fits after the interval or it is turned away.
#[derive(Debug, Clone)]
pub struct RateGate {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl RateGate {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Time left before the next call is allowed, `None` when it is allowed now.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_accepted?;
        let elapsed = now.saturating_duration_since(last);
        self.min_interval
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
    }

    pub fn check(&self, now: Instant) -> Result<(), GateError> {
        match self.remaining(now) {
            // whole seconds, rounded down
            Some(left) => Err(GateError::TooSoon {
                wait_secs: left.as_secs(),
            }),
            None => Ok(()),
        }
    }

    pub fn record(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }
}
