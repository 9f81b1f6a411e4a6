//! Countdown clock
//!
//! Monotonic-while-running, freezable, adjustable T-time source.

pub mod countdown;
pub mod format;

pub use countdown::{ClockError, CountdownClock};
pub use format::{format_t_time, T_STRING_LEN};
