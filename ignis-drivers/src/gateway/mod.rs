//! Actuation gateway implementations
//!
//! Both gateways defer the release half of a pulse: `pulse` energizes the
//! output and queues a [`PendingRelease`], and the host's release task
//! restores the safe state once the duration has elapsed. The sequencing
//! lock is therefore never held across a sleep.

mod framed;
mod sim;

pub use framed::FramedGateway;
pub use sim::{SimGateway, SimWrite, SIM_HISTORY};

use heapless::Deque;
use ignis_core::traits::{Authority, GatewayError, OutputId};

/// Pulses that may await release at once
pub const MAX_PENDING: usize = 8;

/// Second half of a deferred pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingRelease {
    pub output: OutputId,
    pub duration_ms: u32,
    pub authority: Authority,
}

/// Gateways whose pulses are released by the host
pub trait DeferredRelease {
    /// Next queued release, oldest first
    fn take_release(&mut self) -> Option<PendingRelease>;

    /// Restore the output's safe state
    ///
    /// Runs even if safing already forced the output safe.
    fn release(&mut self, pending: PendingRelease) -> Result<(), GatewayError>;
}

/// FIFO of queued releases
#[derive(Debug, Default)]
pub(crate) struct ReleaseQueue {
    queue: Deque<PendingRelease, MAX_PENDING>,
}

impl ReleaseQueue {
    pub(crate) const fn new() -> Self {
        Self {
            queue: Deque::new(),
        }
    }

    pub(crate) fn push(&mut self, pending: PendingRelease) -> Result<(), GatewayError> {
        self.queue
            .push_back(pending)
            .map_err(|_| GatewayError::Busy)
    }

    pub(crate) fn pop(&mut self) -> Option<PendingRelease> {
        self.queue.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }
}
