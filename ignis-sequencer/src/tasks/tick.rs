//! Periodic tick
//!
//! Wakes the interlock monitor on a fixed cadence so redlines and manual
//! aborts are handled even while the feed is silent. The sequencer uses the
//! same interval to bound its wait.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use tracing::info;

use super::now_ms;

/// Milliseconds between ticks
pub const TICK_INTERVAL_MS: u64 = 50;

/// Latest tick time, monotonic ms
pub static TICK_SIGNAL: Signal<CriticalSectionRawMutex, i64> = Signal::new();

#[embassy_executor::task]
pub async fn tick_task() {
    info!("Tick task started, every {} ms", TICK_INTERVAL_MS);

    let mut ticker = Ticker::every(Duration::from_millis(TICK_INTERVAL_MS));
    loop {
        ticker.next().await;
        TICK_SIGNAL.signal(now_ms());
    }
}
