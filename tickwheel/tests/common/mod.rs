//! Shared helpers for integration tests.
//!
//! To see wheel logs while a test runs:
//! ```bash
//! RUST_LOG=tickwheel=debug cargo test -p tickwheel --test threaded -- --nocapture
//! ```

#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;

use proptest::test_runner::Config as ProptestConfig;
use tickwheel::{Clock, DispatchMode, ManualClock, TickerMode, Wheel, WheelConfig};

static INIT_TRACING: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_test_tracing() {
    INIT_TRACING.call_once(|| {
        tickwheel::init_tracing();
    });
}

pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// A wheel with no ticker thread whose callbacks run inline on `tick`.
pub fn manual_wheel(slot_count: usize, tick_interval: Duration, clock: &Arc<ManualClock>) -> Wheel {
    let config = WheelConfig::new(slot_count, tick_interval)
        .with_ticker(TickerMode::Manual)
        .with_dispatch(DispatchMode::Inline)
        .with_clock(Arc::clone(clock) as Arc<dyn Clock>);
    Wheel::with_config(config).expect("manual wheel spawns no threads")
}
