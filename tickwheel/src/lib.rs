//! Single-level hashed timing wheel for large numbers of delayed one-shot
//! callbacks.
//!
//! ```no_run
//! use std::time::Duration;
//! use tickwheel::Wheel;
//!
//! let wheel = Wheel::new(512, Duration::from_millis(10));
//! wheel
//!     .schedule_after("session-42", || println!("expired"), Duration::from_secs(30))
//!     .unwrap();
//! assert!(wheel.cancel("session-42"));
//! wheel.stop();
//! ```
//!
//! - [`timing`]: the single-threaded wheel core and its placement arithmetic.
//! - [`runtime`]: the thread-safe [`Wheel`] with its ticker and dispatcher.

mod config;
mod error;
pub mod runtime;
pub mod timing;
mod trace;

pub use config::{
    DEFAULT_SLOT_COUNT, DEFAULT_THREAD_NAME, DEFAULT_TICK_INTERVAL, DispatchMode, FailureHook,
    TickerMode, WheelConfig,
};
pub use error::{CallbackFailure, WheelError};
pub use runtime::{Wheel, WheelStats};
pub use timing::{Clock, ManualClock, Placement, SystemClock};
pub use trace::init_tracing;

// Fire times are `minstant` instants.
pub use minstant::Instant;
