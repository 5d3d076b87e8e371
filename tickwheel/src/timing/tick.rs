//! Tick-space arithmetic for wheel placement.
//!
//! A delay is quantised onto the tick lattice with
//! `ticks = floor(delay / tick_interval)`. Given the cursor, a span of `ticks`
//! lands in slot `(cursor + ticks) mod slot_count` after sitting out
//! `ticks / slot_count` full revolutions.

use std::num::NonZeroUsize;
use std::time::Duration;

/// A span in tick space (number of ticks).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct TickSpan(u64);

impl TickSpan {
    pub const ZERO: Self = Self(0);

    /// Creates a span from a raw tick count.
    #[inline]
    #[must_use]
    pub const fn new(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the underlying tick count.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Quantises `delay` onto the tick lattice, rounding down.
    ///
    /// Spans too large for `u64` saturate.
    #[must_use]
    pub fn from_delay(delay: Duration, tick_interval: Duration) -> Self {
        let interval_ns = tick_interval.as_nanos().max(1);
        let ticks = delay.as_nanos() / interval_ns;
        Self(u64::try_from(ticks).unwrap_or(u64::MAX))
    }
}

/// Where an entry lands: its slot, and how many revolutions it must wait out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Placement {
    pub slot: usize,
    pub laps: u64,
}

impl Placement {
    /// Places a span relative to `cursor` on a wheel of `slot_count` slots.
    #[must_use]
    pub fn compute(cursor: usize, span: TickSpan, slot_count: NonZeroUsize) -> Self {
        let n = slot_count.get() as u64;
        let offset = span.get() % n;
        let slot = (cursor as u64 % n + offset) % n;
        Self {
            slot: slot as usize,
            laps: span.get() / n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn from_delay_rounds_down() {
        let tick = Duration::from_secs(1);
        assert_eq!(TickSpan::from_delay(Duration::ZERO, tick), TickSpan::ZERO);
        assert_eq!(TickSpan::from_delay(Duration::from_millis(999), tick), TickSpan::ZERO);
        assert_eq!(TickSpan::from_delay(Duration::from_secs(1), tick), TickSpan::new(1));
        assert_eq!(TickSpan::from_delay(Duration::from_millis(5_999), tick), TickSpan::new(5));
    }

    #[test]
    fn from_delay_saturates() {
        let span = TickSpan::from_delay(Duration::MAX, Duration::from_nanos(1));
        assert_eq!(span.get(), u64::MAX);
    }

    #[test]
    fn placement_within_one_revolution() {
        let p = Placement::compute(0, TickSpan::new(5), slots(10));
        assert_eq!(p, Placement { slot: 5, laps: 0 });
    }

    #[test]
    fn placement_records_laps() {
        let p = Placement::compute(0, TickSpan::new(25), slots(10));
        assert_eq!(p, Placement { slot: 5, laps: 2 });

        let exact = Placement::compute(3, TickSpan::new(10), slots(10));
        assert_eq!(exact, Placement { slot: 3, laps: 1 });
    }

    #[test]
    fn placement_wraps_around_cursor() {
        let p = Placement::compute(8, TickSpan::new(4), slots(10));
        assert_eq!(p, Placement { slot: 2, laps: 0 });
    }

    #[test]
    fn zero_span_lands_on_cursor() {
        let p = Placement::compute(7, TickSpan::ZERO, slots(10));
        assert_eq!(p, Placement { slot: 7, laps: 0 });
    }

    #[test]
    fn huge_span_does_not_overflow() {
        let p = Placement::compute(9, TickSpan::new(u64::MAX), slots(10));
        assert_eq!(p.laps, u64::MAX / 10);
        assert_eq!(p.slot, ((u64::MAX % 10 + 9) % 10) as usize);
    }

    #[test]
    fn single_slot_wheel_counts_every_tick_as_a_lap() {
        let p = Placement::compute(0, TickSpan::new(3), slots(1));
        assert_eq!(p, Placement { slot: 0, laps: 3 });
    }
}
