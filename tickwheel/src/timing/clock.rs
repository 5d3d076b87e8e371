//! Sources of "now" for converting absolute fire times into delays.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use minstant::Instant;

/// Monotonic time source consulted by `schedule`.
///
/// The ticker thread always paces itself against the real monotonic clock; a
/// custom clock only changes how absolute fire times are translated into tick
/// counts. Pair [`ManualClock`] with [`TickerMode::Manual`] for fully
/// deterministic tests.
///
/// [`TickerMode::Manual`]: crate::TickerMode::Manual
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The process monotonic clock (TSC-backed where available).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
pub struct ManualClock {
    origin: Instant,
    elapsed_ns: AtomicU64,
}

impl ManualClock {
    /// Creates a clock frozen at the current real instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ns: AtomicU64::new(0),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let by_ns = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_ns.fetch_add(by_ns, Ordering::AcqRel);
    }

    /// Time elapsed since the clock was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::Acquire))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}
