//! Embassy async tasks
//!
//! Each task is spawned once from `main` and communicates via channels/signals.
//! All of them share one [`Controller`] behind a mutex, which is never held
//! across an await on anything but the lock itself.

pub mod feed;
pub mod interlock;
pub mod release;
pub mod sequencer;
pub mod tick;

pub use feed::feed_task;
pub use interlock::interlock_task;
pub use release::release_task;
pub use sequencer::sequencer_task;
pub use tick::tick_task;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::Instant;

use crate::controller::Controller;

/// The controller as shared between tasks
pub type SharedController = Mutex<CriticalSectionRawMutex, Controller>;

/// Monotonic milliseconds since process start
pub fn now_ms() -> i64 {
    Instant::now().as_millis() as i64
}
