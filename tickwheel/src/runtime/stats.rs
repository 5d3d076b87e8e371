//! Counters shared by the wheel handle and the dispatcher.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub scheduled: AtomicU64,
    pub cancelled: AtomicU64,
    pub fired: AtomicU64,
    pub failed: AtomicU64,
}

impl Counters {
    #[inline]
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }
}

/// Point-in-time view of a wheel's activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WheelStats {
    /// Tasks accepted by `schedule`.
    pub scheduled: u64,
    /// Tasks removed by `cancel` or `drain` before maturing.
    pub cancelled: u64,
    /// Tasks that matured and were handed to the dispatcher.
    pub fired: u64,
    /// Callbacks that panicked.
    pub failed: u64,
    /// Advances since the wheel was created.
    pub ticks: u64,
    /// Largest population any single slot has reached.
    pub max_slot_depth: usize,
    /// Most tasks matured by a single advance.
    pub max_fired_per_tick: usize,
}

impl WheelStats {
    pub(crate) fn from_counters(counters: &Counters) -> Self {
        Self {
            scheduled: counters.scheduled.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
            fired: counters.fired.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            ..Self::default()
        }
    }
}
