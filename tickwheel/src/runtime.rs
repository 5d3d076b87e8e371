//! Threads and locking around the wheel core.
//!
//! - `ticker`: fixed-rate background thread that advances a wheel.
//! - `dispatcher`: runs matured callbacks outside the wheel lock, isolating panics.
//! - `wheel`: the public, thread-safe [`Wheel`] handle.

mod dispatcher;
mod stats;
mod ticker;
mod wheel;

pub use stats::WheelStats;
pub use wheel::Wheel;
