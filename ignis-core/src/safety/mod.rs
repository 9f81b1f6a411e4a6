//! Safety monitoring
//!
//! Redline interlocks, the manual abort latch and the safing routine.

pub mod interlock;
pub mod monitor;
pub mod safing;

pub use interlock::{InterlockCondition, TripCause};
pub use monitor::{InterlockMonitor, ResetError};
pub use safing::{SafingReport, SafingRoutine};
