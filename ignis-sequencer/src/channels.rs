//! Inter-task communication channels
//!
//! Static embassy-sync primitives shared by the sequencer tasks and the
//! feed reader threads. They carry messages only; sequencing state lives in
//! the [`crate::controller::Controller`] behind one mutex.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use heapless::String;
use ignis_protocol::MAX_NAME_LEN;

/// Channel capacity for feed updates
const FEED_CHANNEL_SIZE: usize = 64;

/// One named value from the telemetry feed or the operator console
#[derive(Debug, Clone, PartialEq)]
pub struct FeedUpdate {
    pub name: String<MAX_NAME_LEN>,
    pub value: f32,
}

impl FeedUpdate {
    /// `None` if the name does not fit
    pub fn new(name: &str, value: f32) -> Option<Self> {
        let mut owned = String::new();
        owned.push_str(name).ok()?;
        Some(Self { name: owned, value })
    }
}

/// What the reader threads put on the feed
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Update(FeedUpdate),
    /// The stand closed the telemetry link or the read failed
    LinkLost,
}

/// Feed events from the reader threads
pub static FEED_CHANNEL: Channel<CriticalSectionRawMutex, FeedEvent, FEED_CHANNEL_SIZE> =
    Channel::new();

/// Telemetry delivered; wakes the sequencer's bounded wait
pub static TELEMETRY_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Telemetry delivered; wakes the interlock monitor
pub static INTERLOCK_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// A pulse was energized and awaits release
pub static PULSE_QUEUED: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// The sequencer task has finished the session
pub static SHUTDOWN_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();
