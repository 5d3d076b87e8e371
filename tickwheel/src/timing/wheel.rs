//! Hashed timing wheel with O(1) schedule/cancel and per-tick work bounded by
//! the landed slot.
//!
//! Single level. Each slot is a vector that owns its entries; the key index
//! only records `(slot, position)`, so an entry has exactly one owner. Removal
//! is `swap_remove`, with the index entry of the element moved into the hole
//! patched in the same step.
//!
//! The core is single-threaded; `runtime::Wheel` wraps it in one lock.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::process;
use std::time::Duration;

use crate::error::WheelError;
use crate::timing::entry::{Callback, TaskEntry};
use crate::timing::tick::{Placement, TickSpan};
use crate::trace::{error, trace};

/// Position of a live entry in the slot arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Location {
    slot: usize,
    pos: usize,
}

/// The wheel proper: slots, key index and cursor.
pub struct WheelCore {
    slots: Vec<Vec<TaskEntry>>,
    index: HashMap<String, Location>,
    slot_count: NonZeroUsize,
    tick_interval: Duration,
    cursor: usize,
    ticks: u64,
    pub max_fired_per_tick: usize,
    pub max_slot_depth: usize,
}

impl WheelCore {
    /// Creates an empty wheel with the cursor on slot 0.
    ///
    /// A zero `tick_interval` is treated as one nanosecond when quantising.
    #[must_use]
    pub fn new(slot_count: NonZeroUsize, tick_interval: Duration) -> Self {
        Self {
            slots: (0..slot_count.get()).map(|_| Vec::new()).collect(),
            index: HashMap::new(),
            slot_count,
            tick_interval,
            cursor: 0,
            ticks: 0,
            max_fired_per_tick: 0,
            max_slot_depth: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.slot_count.get()
    }

    #[inline]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// The slot the next advance will land on.
    #[inline]
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Total advances since creation.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Number of live entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entries resident in `slot`, in no particular order.
    #[must_use]
    pub fn slot_entries(&self, slot: usize) -> &[TaskEntry] {
        self.slots.get(slot).map_or(&[], Vec::as_slice)
    }

    /// Places `callback` to mature `delay` from the current cursor.
    ///
    /// # Errors
    ///
    /// Returns [`WheelError::DuplicateKey`] if `key` is already live; the live
    /// entry is left in place.
    pub fn schedule(
        &mut self,
        key: String,
        callback: Callback,
        delay: Duration,
    ) -> Result<Placement, WheelError> {
        if self.index.contains_key(&key) {
            return Err(WheelError::DuplicateKey(key));
        }

        let span = TickSpan::from_delay(delay, self.tick_interval);
        let placement = Placement::compute(self.cursor, span, self.slot_count);

        trace!(
            key = %key,
            slot = placement.slot,
            laps = placement.laps,
            "task placed"
        );
        let slot = &mut self.slots[placement.slot];
        let location = Location {
            slot: placement.slot,
            pos: slot.len(),
        };
        self.index.insert(key.clone(), location);
        slot.push(TaskEntry::new(key, callback, placement.slot, placement.laps));
        self.max_slot_depth = self.max_slot_depth.max(slot.len());

        Ok(placement)
    }

    /// Removes the entry for `key` without running it.
    ///
    /// Returns `None` if the key is not live. The caller decides where the
    /// returned callback is dropped.
    pub fn cancel(&mut self, key: &str) -> Option<TaskEntry> {
        let location = *self.index.get(key)?;
        let slot = self
            .slots
            .get_mut(location.slot)
            .unwrap_or_else(|| invariant_violation(&Desync::new(key, location)));
        if let Err(desync) = expect_held(slot, key, location) {
            invariant_violation(&desync);
        }

        self.index.remove(key);
        let entry = slot.swap_remove(location.pos);
        if let Some(moved) = slot.get(location.pos) {
            if let Err(desync) = relocate(&mut self.index, moved.key(), location) {
                invariant_violation(&desync);
            }
        }
        Some(entry)
    }

    /// Advances the cursor by one slot and processes the slot it leaves.
    ///
    /// Entries with laps remaining spend one; due entries are detached from
    /// slot and index and passed to `on_mature`. Returns the number matured.
    pub fn advance(&mut self, mut on_mature: impl FnMut(TaskEntry)) -> usize {
        let landed = self.cursor;
        self.cursor = (self.cursor + 1) % self.slot_count.get();
        self.ticks += 1;

        let slot = &mut self.slots[landed];
        let mut fired = 0;
        let mut pos = 0;
        while pos < slot.len() {
            if slot[pos].spend_lap() {
                pos += 1;
                continue;
            }

            let here = Location { slot: landed, pos };
            if let Err(desync) = expect_indexed(&self.index, slot[pos].key(), here) {
                invariant_violation(&desync);
            }

            // The hole is refilled from the tail, which has not been visited yet,
            // so `pos` stays put.
            let entry = slot.swap_remove(pos);
            self.index.remove(entry.key());
            if let Some(moved) = slot.get(pos) {
                if let Err(desync) = relocate(&mut self.index, moved.key(), here) {
                    invariant_violation(&desync);
                }
            }

            trace!(key = %entry.key(), slot = landed, "task matured");
            on_mature(entry);
            fired += 1;
        }

        self.max_fired_per_tick = self.max_fired_per_tick.max(fired);
        fired
    }

    /// Removes every resident entry without running any of them.
    pub fn drain(&mut self) -> Vec<TaskEntry> {
        self.index.clear();
        self.slots.iter_mut().flat_map(|slot| slot.drain(..)).collect()
    }
}

/// Slot and index disagree about where `key` lives.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Desync {
    key: String,
    at: Location,
}

impl Desync {
    fn new(key: &str, at: Location) -> Self {
        Self {
            key: key.to_owned(),
            at,
        }
    }
}

impl fmt::Display for Desync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entry `{}` is not where the index says (slot {}, position {})",
            self.key, self.at.slot, self.at.pos
        )
    }
}

fn expect_indexed(
    index: &HashMap<String, Location>,
    key: &str,
    at: Location,
) -> Result<(), Desync> {
    match index.get(key) {
        Some(location) if *location == at => Ok(()),
        _ => Err(Desync::new(key, at)),
    }
}

fn expect_held(slot: &[TaskEntry], key: &str, at: Location) -> Result<(), Desync> {
    match slot.get(at.pos) {
        Some(entry) if entry.key() == key => Ok(()),
        _ => Err(Desync::new(key, at)),
    }
}

fn relocate(index: &mut HashMap<String, Location>, key: &str, to: Location) -> Result<(), Desync> {
    let location = index.get_mut(key).ok_or_else(|| Desync::new(key, to))?;
    *location = to;
    Ok(())
}

/// A wheel whose index disagrees with its slots would fire stale callbacks
/// or leak entries. Nothing may keep using it, on any thread, so the process
/// aborts rather than unwinding past the lock.
#[cold]
fn invariant_violation(desync: &Desync) -> ! {
    error!(%desync, "timing wheel invariant violated, aborting");
    process::abort();
}
