use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

/// Time source for trial timing and result timestamps
pub trait Clock: Send {
    /// Monotonic time since an arbitrary fixed origin
    fn now(&self) -> Duration;
    /// Local wall-clock time, truncated to whole seconds
    fn timestamp(&self) -> NaiveDateTime;
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

    fn timestamp(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Hand-driven clock; clones share the same time
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
    base: NaiveDateTime,
}

impl ManualClock {
    pub fn new() -> Self {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap_or_default();
        Self::starting_at(base)
    }

    pub fn starting_at(base: NaiveDateTime) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(0)),
            base,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }

    fn timestamp(&self) -> NaiveDateTime {
        let whole_secs = self.now().as_secs() as i64;
        self.base + chrono::Duration::seconds(whole_secs)
    }
}
