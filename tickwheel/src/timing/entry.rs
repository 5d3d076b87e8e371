//! Per-task records.

use std::fmt;

/// A scheduled unit of work. Runs at most once.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// A task resident in one slot of the wheel.
///
/// `slot` is fixed at scheduling time; only `laps` changes while the entry is
/// resident, dropping by one on each revisit of its slot until it reaches zero
/// and the entry matures.
pub struct TaskEntry {
    key: String,
    callback: Callback,
    slot: usize,
    laps: u64,
}

impl TaskEntry {
    #[inline]
    pub(crate) fn new(key: String, callback: Callback, slot: usize, laps: u64) -> Self {
        Self {
            key,
            callback,
            slot,
            laps,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    #[must_use]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Full revolutions still to sit out before the entry can mature.
    #[inline]
    #[must_use]
    pub fn laps(&self) -> u64 {
        self.laps
    }

    /// Consumes one revolution. Returns `false` if the entry is due instead.
    #[inline]
    pub(crate) fn spend_lap(&mut self) -> bool {
        match self.laps.checked_sub(1) {
            Some(remaining) => {
                self.laps = remaining;
                true
            }
            None => false,
        }
    }

    /// Detaches the callback for dispatch.
    #[inline]
    pub(crate) fn into_matured(self) -> Matured {
        Matured {
            key: self.key,
            callback: self.callback,
        }
    }
}

impl fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEntry")
            .field("key", &self.key)
            .field("slot", &self.slot)
            .field("laps", &self.laps)
            .finish_non_exhaustive()
    }
}

/// A task detached from the wheel and waiting to run.
pub struct Matured {
    key: String,
    callback: Callback,
}

impl Matured {
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (String, Callback) {
        (self.key, self.callback)
    }
}

impl fmt::Debug for Matured {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Matured")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
