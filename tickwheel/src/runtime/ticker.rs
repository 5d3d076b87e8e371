//! Fixed-rate ticker thread.
//!
//! Tick boundaries are absolute: the n-th tick is due at `start + n * interval`
//! regardless of how long earlier ticks took. A ticker that falls behind runs
//! the missed ticks back to back until it has caught up, so the wheel never
//! drifts from wall-clock time.
//!
//! Waiting uses `park_timeout`; `stop` sets the shutdown flag and unparks the
//! thread, so shutdown does not wait out the remainder of a long interval.
//! A deadline past the end of the clock's range is never reached: the thread
//! parks until shutdown.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;

use crate::trace::{debug, info, warn};

/// Handle to a running ticker thread.
pub(crate) struct Ticker {
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// Spawns a thread named `name` that calls `on_tick` once per `interval`.
    pub fn spawn(
        name: String,
        interval: Duration,
        on_tick: impl FnMut() + Send + 'static,
    ) -> io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        debug!(thread = %name, "spawning ticker thread");
        let handle = thread::Builder::new().name(name).spawn(move || {
            info!(
                interval_us = interval.as_micros() as u64,
                "ticker thread started"
            );
            run(interval, &flag, on_tick);
            info!("ticker thread exiting");
        })?;

        Ok(Self { shutdown, handle })
    }

    /// Whether the thread is still running its tick loop.
    #[cfg(test)]
    pub fn is_alive(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Signals the thread and waits for it to exit.
    ///
    /// Must not be called from the ticker thread; `on_tick` never runs user
    /// callbacks, so nothing there can reach it.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            warn!("ticker thread panicked before shutdown");
        }
    }
}

fn run(interval: Duration, shutdown: &AtomicBool, mut on_tick: impl FnMut()) {
    let mut deadline = Instant::now().checked_add(interval);
    let mut behind = false;

    while wait_until(deadline, shutdown) {
        on_tick();
        deadline = deadline.and_then(|d| d.checked_add(interval));
        if deadline.is_none() {
            warn!(
                interval_us = interval.as_micros() as u64,
                "next tick is beyond the clock's range, ticker idle until stopped"
            );
        }

        let lag = deadline.and_then(|d| Instant::now().checked_duration_since(d));
        match lag {
            Some(lag) if lag >= interval => {
                if !behind {
                    warn!(
                        lag_us = lag.as_micros() as u64,
                        "ticker fell behind, running missed ticks back to back"
                    );
                    behind = true;
                }
            }
            _ => behind = false,
        }
    }
}

/// Parks until `deadline`, or until shutdown when there is none. Returns
/// `false` if shutdown was requested first.
fn wait_until(deadline: Option<Instant>, shutdown: &AtomicBool) -> bool {
    loop {
        if shutdown.load(Ordering::Acquire) {
            return false;
        }
        let Some(deadline) = deadline else {
            thread::park();
            continue;
        };
        match deadline.checked_duration_since(Instant::now()) {
            Some(remaining) if !remaining.is_zero() => thread::park_timeout(remaining),
            _ => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::AtomicUsize;

    #[test]
    #[serial]
    fn ticks_at_fixed_rate() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn("ticker-test".into(), Duration::from_millis(5), move || {
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(200));
        ticker.stop();

        let ticks = count.load(Ordering::SeqCst);
        // 40 boundaries elapse; allow generous scheduler slack either way.
        assert!((10..=45).contains(&ticks), "ticked {ticks} times");
    }

    #[test]
    #[serial]
    fn stop_does_not_wait_for_interval() {
        let ticker = Ticker::spawn("ticker-test".into(), Duration::from_secs(3600), || {
            panic!("an hour has not passed");
        })
        .unwrap();

        let start = Instant::now();
        ticker.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn slow_tick_does_not_drift() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let ticker = Ticker::spawn("ticker-test".into(), Duration::from_millis(10), move || {
            // First tick overruns five whole intervals.
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                thread::sleep(Duration::from_millis(50));
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(305));
        ticker.stop();

        // Fixed-delay pacing would manage ~25 ticks here; fixed-rate catches up to ~30.
        let ticks = count.load(Ordering::SeqCst);
        assert!(ticks >= 27, "ticked {ticks} times");
    }

    #[test]
    fn wait_until_past_deadline_returns_immediately() {
        let flag = AtomicBool::new(false);
        assert!(wait_until(Some(Instant::now()), &flag));
    }

    #[test]
    fn wait_until_honours_shutdown() {
        let flag = AtomicBool::new(true);
        let deadline = Instant::now().checked_add(Duration::from_secs(3600));
        assert!(!wait_until(deadline, &flag));
        assert!(!wait_until(None, &flag));
    }

    #[test]
    #[serial]
    fn interval_beyond_clock_range_idles_until_stopped() {
        let ticker = Ticker::spawn("ticker-test".into(), Duration::MAX, || {
            panic!("a tick that can never be due");
        })
        .unwrap();

        thread::sleep(Duration::from_millis(50));
        assert!(ticker.is_alive(), "ticker thread died");

        let start = Instant::now();
        ticker.stop();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
