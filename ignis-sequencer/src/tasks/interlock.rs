//! Interlock monitor task
//!
//! Runs the interlock side of the session on every telemetry delivery and
//! on every tick. Only this task can trip safing.

use embassy_futures::select::select;
use tracing::{error, info};

use super::tick::TICK_SIGNAL;
use super::{now_ms, SharedController};
use crate::channels::INTERLOCK_SIGNAL;

#[embassy_executor::task]
pub async fn interlock_task(controller: &'static SharedController) {
    info!("Interlock task started");

    loop {
        select(INTERLOCK_SIGNAL.wait(), TICK_SIGNAL.wait()).await;

        let mut ctl = controller.lock().await;
        if ctl.is_shutdown() {
            info!("Interlock task stopping");
            return;
        }
        if let Some(cause) = ctl.monitor(now_ms()) {
            error!("Interlock tripped: {:?}", cause);
        }
    }
}
