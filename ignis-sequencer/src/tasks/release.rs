//! Pulse release task
//!
//! The scheduler energizes pulsed outputs under the controller lock and
//! returns at once; this task restores their safe state when each pulse
//! duration has elapsed.

use embassy_futures::select::select;
use embassy_time::{Duration, Timer};
use tracing::info;

use super::{now_ms, SharedController};
use crate::channels::PULSE_QUEUED;

/// Wait used when nothing is scheduled
const IDLE_WAIT_MS: u64 = 1_000;

#[embassy_executor::task]
pub async fn release_task(controller: &'static SharedController) {
    info!("Release task started");

    loop {
        let next_due = {
            let mut ctl = controller.lock().await;
            let now = now_ms();
            ctl.collect_releases(now);
            ctl.release_due(now)
        };

        let wait_ms = match next_due {
            Some(due) => (due - now_ms()).max(0) as u64,
            None => IDLE_WAIT_MS,
        };
        select(
            PULSE_QUEUED.wait(),
            Timer::after(Duration::from_millis(wait_ms)),
        )
        .await;
    }
}
