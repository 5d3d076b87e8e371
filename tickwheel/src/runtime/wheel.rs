//! The thread-safe wheel handle.
//!
//! One `parking_lot` mutex guards the core (slots, index and cursor) as a
//! unit. Schedule and cancel hold it for O(1) work; a tick holds it only while
//! the landed slot is scanned. Matured callbacks are detached under the lock
//! and dispatched after it is released, so a callback may freely schedule or
//! cancel on the wheel that fired it.

use std::fmt;
use std::num::NonZeroUsize;
use std::panic::{self, AssertUnwindSafe};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use minstant::Instant;
use parking_lot::Mutex;

use crate::config::{TickerMode, WheelConfig};
use crate::error::WheelError;
use crate::runtime::dispatcher::{Dispatcher, Executor};
use crate::runtime::stats::{Counters, WheelStats};
use crate::runtime::ticker::Ticker;
use crate::timing::{Callback, Clock, Placement, WheelCore};
use crate::trace::{debug, error, info, trace};

/// State shared between the handle and the ticker thread.
struct Shared {
    core: Mutex<WheelCore>,
    slot_count: usize,
    tick_interval: Duration,
    clock: Arc<dyn Clock>,
    dispatcher: Dispatcher,
    counters: Arc<Counters>,
    running: AtomicBool,
}

impl Shared {
    fn tick(&self) -> usize {
        if !self.running.load(Ordering::Acquire) {
            return 0;
        }

        let mut matured = Vec::new();
        let fired = self
            .core
            .lock()
            .advance(|entry| matured.push(entry.into_matured()));

        if fired > 0 {
            Counters::add(&self.counters.fired, fired as u64);
            for task in matured {
                self.dispatcher.dispatch(task);
            }
        }
        fired
    }
}

/// A single-level hashed timing wheel.
///
/// Tasks are one-shot callbacks registered under a unique string key. Each
/// task is placed in slot `(cursor + ticks) mod slot_count` with
/// `ticks / slot_count` laps to sit out, where `ticks` is its delay quantised
/// down to whole tick intervals. Insertion and cancellation are O(1); a tick
/// costs the size of the slot it lands on.
///
/// A delay of `d` ticks matures on the `d + 1`-th advance after scheduling:
/// the advance that is already in progress (the partial interval before the
/// next boundary) is counted as one, so a callback never fires early by more
/// than one interval and never late by more than one interval plus dispatch.
///
/// Dropping the wheel stops it.
pub struct Wheel {
    shared: Arc<Shared>,
    ticker: Mutex<Option<Ticker>>,
}

impl Wheel {
    /// Creates and starts a wheel with the given geometry and default settings.
    ///
    /// A zero `slot_count` or `tick_interval` is replaced by
    /// [`DEFAULT_SLOT_COUNT`](crate::DEFAULT_SLOT_COUNT) or
    /// [`DEFAULT_TICK_INTERVAL`](crate::DEFAULT_TICK_INTERVAL) and a warning is
    /// logged.
    ///
    /// # Panics
    ///
    /// Panics if the ticker or worker thread cannot be spawned. Use
    /// [`Wheel::with_config`] to handle that case.
    #[must_use]
    pub fn new(slot_count: usize, tick_interval: Duration) -> Self {
        match Self::with_config(WheelConfig::new(slot_count, tick_interval)) {
            Ok(wheel) => wheel,
            Err(e) => panic!("failed to start timing wheel: {e}"),
        }
    }

    /// Creates and starts a wheel from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::Spawn`] if a ticker or worker thread cannot be
    /// spawned. Out-of-range geometry is sanitized, never rejected, and
    /// [`DispatchMode::Inline`](crate::DispatchMode::Inline) on a threaded
    /// wheel is replaced by a single worker.
    pub fn with_config(config: WheelConfig) -> Result<Self, WheelError> {
        let config = config.sanitize();
        // Non-zero after sanitize.
        let slot_count = NonZeroUsize::new(config.slot_count).unwrap_or(NonZeroUsize::MIN);

        let counters = Arc::new(Counters::default());
        let executor = Executor::new(config.on_callback_failure.clone(), Arc::clone(&counters));
        let dispatcher = Dispatcher::spawn(config.dispatch, &config.thread_name, executor)?;

        let shared = Arc::new(Shared {
            core: Mutex::new(WheelCore::new(slot_count, config.tick_interval)),
            slot_count: slot_count.get(),
            tick_interval: config.tick_interval,
            clock: Arc::clone(&config.clock),
            dispatcher,
            counters,
            running: AtomicBool::new(true),
        });

        let ticker = match config.ticker {
            TickerMode::Manual => None,
            TickerMode::Threaded => {
                let thread = format!("{}-ticker", config.thread_name);
                let tick_shared = Arc::clone(&shared);
                let ticker = Ticker::spawn(thread.clone(), config.tick_interval, move || {
                    // Callbacks never run here and their panics are caught by
                    // the dispatcher; anything reaching here is a broken wheel.
                    if panic::catch_unwind(AssertUnwindSafe(|| tick_shared.tick())).is_err() {
                        error!("wheel tick panicked, aborting");
                        process::abort();
                    }
                })
                .map_err(|source| {
                    error!(thread = %thread, error = %source, "failed to spawn ticker thread");
                    WheelError::Spawn { thread, source }
                })?;
                Some(ticker)
            }
        };

        info!(
            slot_count = config.slot_count,
            tick_interval_us = config.tick_interval.as_micros() as u64,
            dispatch = ?config.dispatch,
            ticker = ?config.ticker,
            "wheel started"
        );

        Ok(Self {
            shared,
            ticker: Mutex::new(ticker),
        })
    }

    /// Schedules `callback` to run at `fire_at`.
    ///
    /// A `fire_at` in the past is treated as "now": the task matures on the
    /// next tick. The callback never runs inside this call.
    ///
    /// # Errors
    ///
    /// - [`WheelError::DuplicateKey`] if `key` is still live. The live task is
    ///   kept as it was.
    /// - [`WheelError::Stopped`] after [`Wheel::stop`].
    pub fn schedule(
        &self,
        key: impl Into<String>,
        callback: impl FnOnce() + Send + 'static,
        fire_at: Instant,
    ) -> Result<Placement, WheelError> {
        let clock = &self.shared.clock;
        self.insert(key.into(), Box::new(callback), || {
            fire_at
                .checked_duration_since(clock.now())
                .unwrap_or(Duration::ZERO)
        })
    }

    /// Schedules `callback` to run `delay` from now.
    ///
    /// # Errors
    ///
    /// As [`Wheel::schedule`].
    pub fn schedule_after(
        &self,
        key: impl Into<String>,
        callback: impl FnOnce() + Send + 'static,
        delay: Duration,
    ) -> Result<Placement, WheelError> {
        self.insert(key.into(), Box::new(callback), || delay)
    }

    /// `delay` is evaluated under the lock so "now" and the cursor agree.
    fn insert(
        &self,
        key: String,
        callback: Callback,
        delay: impl FnOnce() -> Duration,
    ) -> Result<Placement, WheelError> {
        let mut core = self.shared.core.lock();
        if !self.shared.running.load(Ordering::Acquire) {
            return Err(WheelError::Stopped);
        }
        let placement = core.schedule(key, callback, delay())?;
        drop(core);

        Counters::add(&self.shared.counters.scheduled, 1);
        Ok(placement)
    }

    /// Removes the task for `key` if it has not matured yet.
    ///
    /// Returns `false` if the key is unknown, already cancelled, or already
    /// detached for firing; in the last case the callback still runs.
    pub fn cancel(&self, key: &str) -> bool {
        let entry = self.shared.core.lock().cancel(key);
        match entry {
            Some(entry) => {
                Counters::add(&self.shared.counters.cancelled, 1);
                trace!(key = %entry.key(), slot = entry.slot(), "task cancelled");
                true
            }
            None => {
                trace!(key = %key, "cancel found no live task");
                false
            }
        }
    }

    /// Performs one advance on the calling thread.
    ///
    /// Returns the number of tasks that matured and were handed to the
    /// dispatcher. This is how a [`TickerMode::Manual`] wheel is driven; on a
    /// threaded wheel it inserts an extra advance. Returns 0 once stopped.
    pub fn tick(&self) -> usize {
        self.shared.tick()
    }

    /// Stops the wheel. Idempotent.
    ///
    /// The ticker thread is joined; callbacks never run on it, so a callback
    /// may stop its own wheel. The dispatch queue is closed; callbacks already queued
    /// still run. Resident tasks are neither fired nor cancelled; they are
    /// released when the wheel drops. Call [`Wheel::drain`] first to collect
    /// their keys.
    pub fn stop(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.stop();
        }
        self.shared.dispatcher.close();
        info!(abandoned = self.len(), "wheel stopped");
    }

    /// Removes every resident task without running it and returns their keys.
    pub fn drain(&self) -> Vec<String> {
        let entries = self.shared.core.lock().drain();
        Counters::add(&self.shared.counters.cancelled, entries.len() as u64);
        debug!(count = entries.len(), "wheel drained");
        entries.iter().map(|e| e.key().to_owned()).collect()
    }

    /// Number of resident tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.core.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.core.lock().is_empty()
    }

    /// Whether `key` is resident, i.e. scheduled and neither cancelled nor matured.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.shared.core.lock().contains(key)
    }

    /// The slot the next tick lands on.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.shared.core.lock().cursor()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.shared.slot_count
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.shared.tick_interval
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn stats(&self) -> WheelStats {
        let core = self.shared.core.lock();
        WheelStats {
            ticks: core.ticks(),
            max_slot_depth: core.max_slot_depth,
            max_fired_per_tick: core.max_fired_per_tick,
            ..WheelStats::from_counters(&self.shared.counters)
        }
    }
}

impl Drop for Wheel {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for Wheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = self.shared.core.lock();
        f.debug_struct("Wheel")
            .field("slot_count", &self.shared.slot_count)
            .field("tick_interval", &self.shared.tick_interval)
            .field("cursor", &core.cursor())
            .field("len", &core.len())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
