//! Sequencer task
//!
//! Runs the scheduler side of the session. Each pass waits for the next
//! telemetry delivery, bounded by the tick interval, so a paused validation
//! hold still times out when the feed is silent.

use embassy_time::{with_timeout, Duration};
use ignis_core::state::SessionState;
use tracing::info;

use super::tick::TICK_INTERVAL_MS;
use super::{now_ms, SharedController};
use crate::channels::{PULSE_QUEUED, SHUTDOWN_SIGNAL, TELEMETRY_SIGNAL};

/// Run until the session shuts down
#[embassy_executor::task]
pub async fn sequencer_task(controller: &'static SharedController) {
    info!("Sequencer task started");

    loop {
        // Timeout is the normal path when the feed is quiet
        let _ = with_timeout(
            Duration::from_millis(TICK_INTERVAL_MS),
            TELEMETRY_SIGNAL.wait(),
        )
        .await;

        let mut ctl = controller.lock().await;
        let now = now_ms();
        let report = ctl.tick(now);
        if !report.scheduler.fired.is_empty() && ctl.collect_releases(now) {
            PULSE_QUEUED.signal(());
        }

        if report.state == SessionState::Shutdown {
            // In-flight pulses complete their release path before exit
            ctl.release_all();
            info!("Sequencer stopped at T{:+} ms", report.t_ms);
            SHUTDOWN_SIGNAL.signal(());
            return;
        }
    }
}
