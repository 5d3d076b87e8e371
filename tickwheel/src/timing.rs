//! Timing primitives.
//!
//! - `tick`: delay quantisation and slot/lap placement.
//! - `entry`: the record stored for each scheduled task.
//! - `wheel`: the single-threaded wheel core; locking lives in `runtime`.
//! - `clock`: injectable source of "now".

mod clock;
mod entry;
mod tick;
pub(crate) mod wheel;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{Callback, Matured, TaskEntry};
pub use tick::{Placement, TickSpan};
pub use wheel::WheelCore;
