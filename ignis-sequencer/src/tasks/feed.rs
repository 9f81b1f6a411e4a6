//! Feed task
//!
//! Drains updates from the reader threads into the controller. Every
//! telemetry delivery is a tick boundary for both the sequencer and the
//! interlock monitor. A lost stand link withdraws main hold clearance.

use tracing::{debug, info};

use super::{now_ms, SharedController};
use crate::channels::{FeedEvent, FEED_CHANNEL, INTERLOCK_SIGNAL, TELEMETRY_SIGNAL};
use crate::controller::Delivery;

#[embassy_executor::task]
pub async fn feed_task(controller: &'static SharedController) {
    info!("Feed task started");

    loop {
        let update = match FEED_CHANNEL.receive().await {
            FeedEvent::Update(update) => update,
            FeedEvent::LinkLost => {
                controller.lock().await.link_lost(now_ms());
                wake();
                continue;
            }
        };
        let delivery = controller
            .lock()
            .await
            .deliver(&update.name, update.value, now_ms());

        match delivery {
            Delivery::Control(control) => {
                debug!("Control {:?}", control);
                // Controls can change permissives; evaluate promptly
                wake();
            }
            Delivery::Telemetry(_) => wake(),
            Delivery::Ignored => {}
        }
    }
}

fn wake() {
    INTERLOCK_SIGNAL.signal(());
    TELEMETRY_SIGNAL.signal(());
}
