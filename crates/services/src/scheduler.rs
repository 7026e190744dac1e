//! Periodic triggers and the time source they are paired with.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

use quiz_core::{Clock, ManualClock};

/// Default spacing between countdown observations.
pub const DEFAULT_TICK: StdDuration = StdDuration::from_secs(1);

/// A source of periodic wake-ups. Ticks carry no time; readers ask the clock.
#[async_trait]
pub trait Ticker: Send {
    /// Resolves at the next tick. Must be cancel-safe.
    async fn tick(&mut self);
}

/// Hands out the clock and periodic trigger a session runs on.
pub trait Scheduler: Send + Sync {
    fn clock(&self) -> Clock;

    fn periodic(&self) -> Box<dyn Ticker>;
}

/// Wall-clock time with a tokio interval.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    period: StdDuration,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(period: StdDuration) -> Self {
        Self { period }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

impl Scheduler for TokioScheduler {
    fn clock(&self) -> Clock {
        Clock::default_clock()
    }

    fn periodic(&self) -> Box<dyn Ticker> {
        Box::new(IntervalTicker::every(self.period))
    }
}

/// `tokio::time::Interval` whose first tick lands one period from now.
///
/// Late ticks are delayed rather than burst; the countdown reads the clock
/// anyway, so a skipped beat never skews the remaining time.
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn every(period: StdDuration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Test scheduler: time and ticks only move when the test says so.
#[derive(Clone)]
pub struct ManualScheduler {
    clock: ManualClock,
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<()>>>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn starting_at(at: DateTime<Utc>) -> Self {
        Self {
            clock: ManualClock::starting_at(at),
            sender: Arc::new(Mutex::new(None)),
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn clock_handle(&self) -> &ManualClock {
        &self.clock
    }

    /// Wake the most recently issued ticker without moving time.
    pub fn tick(&self) {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = guard.as_ref() {
            // A dropped ticker simply misses the beat.
            let _ = sender.send(());
        }
    }

    /// Move time forward by `delta`, then tick once.
    pub fn advance(&self, delta: Duration) {
        self.clock.advance(delta);
        self.tick();
    }

    /// Move time forward one second at a time, ticking after each step.
    pub fn advance_secs(&self, seconds: u32) {
        for _ in 0..seconds {
            self.advance(Duration::seconds(1));
        }
    }

    /// True while the issued ticker is still alive.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|sender| !sender.is_closed())
    }
}

impl Scheduler for ManualScheduler {
    fn clock(&self) -> Clock {
        Clock::manual(&self.clock)
    }

    fn periodic(&self) -> Box<dyn Ticker> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.sender.lock().unwrap_or_else(PoisonError::into_inner) = Some(sender);
        Box::new(ManualTicker { receiver })
    }
}

struct ManualTicker {
    receiver: mpsc::UnboundedReceiver<()>,
}

#[async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.receiver.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
