//! Events that trigger session state transitions

use crate::hold::HoldReason;
use crate::safety::TripCause;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Main hold
    /// T-time left the sequence window
    WindowExited,
    /// A permissive is missing; clock paused
    HoldEngaged(HoldReason),
    /// All permissives hold; clock running
    HoldReleased,

    // Validation hold
    /// Bounded wait started
    ValidationStarted,
    /// Bands met or override
    ValidationCleared,
    /// Bounded wait expired
    ValidationStalled,

    // Scheduler
    /// Every event fired
    SequenceComplete,

    // Safety
    /// Interlock monitor tripped
    InterlockTripped(TripCause),
    /// Operator reset the latched trip
    InterlockReset,

    /// Operator shutdown
    ShutdownRequested,
}
