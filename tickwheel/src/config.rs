//! Wheel configuration.
//!
//! Geometry (slot count, tick interval) is fixed for the lifetime of a wheel.
//! The remaining knobs choose how the wheel is driven and where matured
//! callbacks run.
//!
//! # Choosing a geometry
//!
//! One revolution covers `slot_count * tick_interval`. Delays longer than that
//! are still accepted and cost nothing extra at insertion; the entry simply
//! records how many revolutions it must sit out. Per-tick work is the size of
//! the landed slot, so more slots spread the same population thinner.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{CallbackFailure, WheelError};
use crate::timing::{Clock, SystemClock};
use crate::trace::warn;

/// Slot count substituted when zero is requested.
pub const DEFAULT_SLOT_COUNT: usize = 10;

/// Tick interval substituted when a zero interval is requested.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Prefix for the names of threads a wheel spawns.
pub const DEFAULT_THREAD_NAME: &str = "tickwheel";

/// Observer invoked for every callback that panics during dispatch.
pub type FailureHook = Arc<dyn Fn(&CallbackFailure) + Send + Sync + 'static>;

/// Where matured callbacks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// On the thread that called [`Wheel::tick`](crate::Wheel::tick), after the
    /// wheel lock is released.
    ///
    /// Only valid with [`TickerMode::Manual`]. A threaded wheel never runs
    /// callbacks on its ticker thread, so `sanitize` replaces this with one
    /// worker there.
    Inline,
    /// On a pool of dedicated worker threads fed by a queue.
    Workers(NonZeroUsize),
}

impl Default for DispatchMode {
    fn default() -> Self {
        Self::Workers(NonZeroUsize::MIN)
    }
}

/// How the wheel is advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickerMode {
    /// A background thread owned by the wheel ticks at a fixed rate.
    #[default]
    Threaded,
    /// No thread is spawned; the host calls [`Wheel::tick`](crate::Wheel::tick).
    Manual,
}

/// Configuration for a [`Wheel`](crate::Wheel).
#[derive(Clone)]
pub struct WheelConfig {
    /// Number of slots in the circular array.
    ///
    /// **Default**: 10
    pub slot_count: usize,

    /// Wall-clock time represented by one slot.
    ///
    /// **Default**: 1s
    pub tick_interval: Duration,

    /// Where matured callbacks run.
    ///
    /// **Default**: one worker thread
    pub dispatch: DispatchMode,

    /// Background ticker or manual driving.
    ///
    /// **Default**: [`TickerMode::Threaded`]
    pub ticker: TickerMode,

    /// Source of "now" used to turn absolute fire times into delays.
    ///
    /// **Default**: [`SystemClock`]
    pub clock: Arc<dyn Clock>,

    /// Prefix for spawned thread names (`{prefix}-ticker`, `{prefix}-worker-{n}`).
    pub thread_name: String,

    /// Called with every callback panic, in addition to the `error` log.
    pub on_callback_failure: Option<FailureHook>,
}

impl WheelConfig {
    /// Creates a configuration with the given geometry and default everything else.
    #[must_use]
    pub fn new(slot_count: usize, tick_interval: Duration) -> Self {
        Self {
            slot_count,
            tick_interval,
            ..Self::default()
        }
    }

    /// Checks the geometry without correcting it.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::InvalidConfiguration`] naming the first field that
    /// is out of range.
    pub fn validate(&self) -> Result<(), WheelError> {
        if self.slot_count == 0 {
            return Err(WheelError::InvalidConfiguration {
                field: "slot_count",
                reason: "slot count must be greater than 0",
            });
        }
        if self.tick_interval.is_zero() {
            return Err(WheelError::InvalidConfiguration {
                field: "tick_interval",
                reason: "tick interval must be greater than 0",
            });
        }
        if self.dispatch == DispatchMode::Inline && self.ticker == TickerMode::Threaded {
            return Err(WheelError::InvalidConfiguration {
                field: "dispatch",
                reason: "inline dispatch requires a manual ticker",
            });
        }
        Ok(())
    }

    /// Replaces out-of-range values with their defaults, logging each substitution.
    #[must_use]
    pub fn sanitize(mut self) -> Self {
        if self.slot_count == 0 {
            warn!(
                requested = self.slot_count,
                substituted = DEFAULT_SLOT_COUNT,
                "slot count must be greater than 0, using default"
            );
            self.slot_count = DEFAULT_SLOT_COUNT;
        }
        if self.tick_interval.is_zero() {
            warn!(
                substituted_ms = DEFAULT_TICK_INTERVAL.as_millis() as u64,
                "tick interval must be greater than 0, using default"
            );
            self.tick_interval = DEFAULT_TICK_INTERVAL;
        }
        if self.dispatch == DispatchMode::Inline && self.ticker == TickerMode::Threaded {
            warn!("inline dispatch would run callbacks on the ticker thread, using one worker");
            self.dispatch = DispatchMode::Workers(NonZeroUsize::MIN);
        }
        if self.thread_name.is_empty() {
            self.thread_name = DEFAULT_THREAD_NAME.to_owned();
        }
        self
    }

    /// Time covered by one full revolution of the cursor.
    #[must_use]
    pub fn revolution(&self) -> Duration {
        let slots = u32::try_from(self.slot_count).unwrap_or(u32::MAX);
        self.tick_interval.saturating_mul(slots)
    }

    /// Builder-style setter for dispatch mode.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Builder-style setter for ticker mode.
    #[must_use]
    pub fn with_ticker(mut self, ticker: TickerMode) -> Self {
        self.ticker = ticker;
        self
    }

    /// Builder-style setter for the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builder-style setter for the thread name prefix.
    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Builder-style setter for the callback failure hook.
    #[must_use]
    pub fn with_failure_hook(
        mut self,
        hook: impl Fn(&CallbackFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_callback_failure = Some(Arc::new(hook));
        self
    }
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            slot_count: DEFAULT_SLOT_COUNT,
            tick_interval: DEFAULT_TICK_INTERVAL,
            dispatch: DispatchMode::default(),
            ticker: TickerMode::default(),
            clock: Arc::new(SystemClock),
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
            on_callback_failure: None,
        }
    }
}

impl fmt::Debug for WheelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WheelConfig")
            .field("slot_count", &self.slot_count)
            .field("tick_interval", &self.tick_interval)
            .field("dispatch", &self.dispatch)
            .field("ticker", &self.ticker)
            .field("thread_name", &self.thread_name)
            .field("on_callback_failure", &self.on_callback_failure.is_some())
            .finish_non_exhaustive()
    }
}
