use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

use quiz_core::Clock;
use quiz_core::time::{format_countdown, is_low_time};

use crate::scheduler::Ticker;

/// Something the countdown has to tell its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Tick { remaining: Duration },
    /// Emitted once, the first time the remaining time reaches zero.
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Running,
    Stopped,
}

/// Remaining time against a fixed deadline.
///
/// The remaining time is recomputed from the deadline and the clock on
/// every observation, so late or skipped ticks never accumulate into drift.
pub struct CountdownClock {
    deadline: DateTime<Utc>,
    limit: Duration,
    clock: Clock,
    ticker: Option<Box<dyn Ticker>>,
    expired: bool,
}

impl CountdownClock {
    /// Start counting down `limit` from `started_at`.
    ///
    /// A start later than the clock's current time counts from now.
    #[must_use]
    pub fn start(started_at: DateTime<Utc>, limit: Duration, clock: Clock, ticker: Box<dyn Ticker>) -> Self {
        let deadline = started_at.min(clock.now()) + limit;
        debug!("countdown running until {deadline}");
        Self {
            deadline,
            limit,
            clock,
            ticker: Some(ticker),
            expired: false,
        }
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn state(&self) -> ClockState {
        if self.ticker.is_some() {
            ClockState::Running
        } else {
            ClockState::Stopped
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ClockState::Running
    }

    /// True once `Expired` has been emitted.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expired
    }

    /// Time left, never negative and never more than the time limit.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        (self.deadline - self.clock.now()).clamp(Duration::zero(), self.limit)
    }

    #[must_use]
    pub fn formatted_remaining(&self) -> String {
        format_countdown(self.remaining())
    }

    #[must_use]
    pub fn is_low_time(&self) -> bool {
        is_low_time(self.remaining())
    }

    /// Read the clock once. `None` when stopped.
    ///
    /// Reaching zero yields `Expired` and stops the countdown.
    pub fn observe(&mut self) -> Option<ClockEvent> {
        if !self.is_running() {
            return None;
        }
        let remaining = self.remaining();
        if remaining > Duration::zero() {
            return Some(ClockEvent::Tick { remaining });
        }
        info!("time limit reached at {}", self.deadline);
        self.expired = true;
        self.cancel();
        Some(ClockEvent::Expired)
    }

    /// Wait for the next tick and observe. Never resolves once stopped.
    pub async fn next_event(&mut self) -> ClockEvent {
        loop {
            let Some(ticker) = self.ticker.as_mut() else {
                return std::future::pending().await;
            };
            ticker.tick().await;
            if let Some(event) = self.observe() {
                return event;
            }
        }
    }

    /// Stop for good and release the periodic trigger.
    pub fn cancel(&mut self) {
        if self.ticker.take().is_some() {
            debug!("countdown stopped");
        }
    }
}

impl std::fmt::Debug for CountdownClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountdownClock")
            .field("deadline", &self.deadline)
            .field("state", &self.state())
            .field("expired", &self.expired)
            .finish_non_exhaustive()
    }
}
