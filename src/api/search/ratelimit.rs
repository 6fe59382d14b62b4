//! Call spacing for the analytics API.
//!
//! The limiter enforces a minimum gap of `60 / max_per_minute` seconds between
//! the end of one call and the start of the next. Calls are serialized, so the
//! last-call timestamp is plain owned state.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

/// Source of time and blocking waits.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Virtual clock: sleeping advances time instantly and is recorded.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    sleeps: RefCell<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves time forward without recording a sleep, e.g. to model call latency.
    pub fn advance(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
        self.advance(duration);
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[derive(Debug)]
pub struct RateLimiter<C: Clock = SystemClock> {
    min_interval: Duration,
    last_call: Option<Duration>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// A `max_per_minute` of 0 disables limiting.
    pub fn new(max_per_minute: u32) -> Self {
        Self::with_clock(max_per_minute, SystemClock::new())
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(max_per_minute: u32, clock: C) -> Self {
        let min_interval = if max_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(60.0 / f64::from(max_per_minute))
        };
        Self {
            min_interval,
            last_call: None,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Blocks until the next call is allowed. Returns how long it waited.
    pub fn wait(&self) -> Duration {
        let Some(last) = self.last_call else {
            return Duration::ZERO;
        };
        let elapsed = self.clock.now().saturating_sub(last);
        let wait_for = self.min_interval.saturating_sub(elapsed);
        if !wait_for.is_zero() {
            log::debug!("Rate limit: sleeping {:?} before next call", wait_for);
            self.clock.sleep(wait_for);
        }
        wait_for
    }

    pub fn record_call(&mut self) {
        self.last_call = Some(self.clock.now());
    }

    /// Runs `call` once the window allows it: wait, call, then stamp the time.
    pub fn call<R>(&mut self, call: impl FnOnce() -> R) -> R {
        self.wait();
        let result = call();
        self.record_call();
        result
    }
}
