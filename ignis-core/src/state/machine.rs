//! Session state machine
//!
//! The externally visible session state is a function of the previous state
//! and an event. The session feeds events every tick; repeated events are
//! harmless.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::events::Event;
use crate::hold::HoldReason;
use crate::safety::TripCause;

/// Session states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SessionState {
    /// Outside the sequence window
    Idle,
    /// Inside the window, clock paused on a permissive
    Holding(HoldReason),
    /// Inside the window, clock running
    Counting,
    /// Clock paused on the validation hold
    Validating,
    /// Validation timed out; main hold must be re-cleared
    Stalled,
    /// Interlock tripped; outputs safed
    Aborted(TripCause),
    /// Every event fired; outputs safed
    Complete,
    /// Operator shutdown; terminal
    Shutdown,
}

impl SessionState {
    /// Scheduled actions may fire
    pub fn firing_allowed(&self) -> bool {
        matches!(self, SessionState::Counting)
    }

    /// Inside the sequence window
    pub fn in_sequence(&self) -> bool {
        matches!(
            self,
            SessionState::Holding(_)
                | SessionState::Counting
                | SessionState::Validating
                | SessionState::Stalled
        )
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SessionState::Aborted(_))
    }

    /// No further transitions except shutdown or reset
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Aborted(_) | SessionState::Complete | SessionState::Shutdown
        )
    }

    /// Status code published on the command link
    pub fn code(&self) -> u8 {
        match self {
            SessionState::Idle => 0,
            SessionState::Holding(_) => 1,
            SessionState::Counting => 2,
            SessionState::Validating => 3,
            SessionState::Stalled => 4,
            SessionState::Aborted(_) => 5,
            SessionState::Complete => 6,
            SessionState::Shutdown => 7,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "IDLE",
            SessionState::Holding(_) => "HOLDING",
            SessionState::Counting => "COUNTING",
            SessionState::Validating => "VALIDATING",
            SessionState::Stalled => "STALLED",
            SessionState::Aborted(_) => "ABORTED",
            SessionState::Complete => "COMPLETE",
            SessionState::Shutdown => "SHUTDOWN",
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use SessionState::*;

        match (self, event) {
            // Shutdown wins from anywhere
            (_, ShutdownRequested) => Shutdown,
            (Shutdown, _) => Shutdown,

            // Trips latch from any live state
            (Aborted(cause), _) if !matches!(event, InterlockReset) => Aborted(cause),
            (Aborted(_), InterlockReset) => Idle,
            (_, InterlockTripped(cause)) => Aborted(cause),

            // Completion holds until the clock is wound back out of the window
            (Complete, WindowExited) => Idle,
            (Complete, _) => Complete,

            (_, WindowExited) => Idle,
            (_, SequenceComplete) => Complete,

            // Stalled only leaves through a fresh clearance
            (Stalled, HoldReleased) => Counting,
            (Stalled, ValidationStarted) => Validating,
            (Stalled, ValidationCleared) => Counting,
            (Stalled, _) => Stalled,

            (Validating, ValidationCleared) => Counting,
            (Validating, ValidationStalled) => Stalled,
            (Validating, HoldEngaged(reason)) => Holding(reason),
            (Validating, _) => Validating,

            (_, HoldEngaged(reason)) => Holding(reason),
            (_, HoldReleased) => Counting,
            (Counting, ValidationStarted) => Validating,
            (Counting, ValidationStalled) => Stalled,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_flow() {
        let s = SessionState::Idle;
        let s = s.transition(Event::HoldEngaged(HoldReason::NotCleared));
        assert_eq!(s, SessionState::Holding(HoldReason::NotCleared));
        let s = s.transition(Event::HoldReleased);
        assert_eq!(s, SessionState::Counting);
        let s = s.transition(Event::ValidationStarted);
        assert_eq!(s, SessionState::Validating);
        let s = s.transition(Event::ValidationCleared);
        assert_eq!(s, SessionState::Counting);
        let s = s.transition(Event::SequenceComplete);
        assert_eq!(s, SessionState::Complete);
    }

    #[test]
    fn test_validating_ignores_release() {
        let s = SessionState::Validating.transition(Event::HoldReleased);
        assert_eq!(s, SessionState::Validating);
    }

    #[test]
    fn test_stall_and_retry() {
        let s = SessionState::Validating.transition(Event::ValidationStalled);
        assert_eq!(s, SessionState::Stalled);
        assert_eq!(
            s.transition(Event::HoldEngaged(HoldReason::NotCleared)),
            SessionState::Stalled
        );
        assert_eq!(
            s.transition(Event::ValidationStarted),
            SessionState::Validating
        );
    }

    #[test]
    fn test_trip_from_any_live_state() {
        let states = [
            SessionState::Idle,
            SessionState::Holding(HoldReason::NotArmed),
            SessionState::Counting,
            SessionState::Validating,
            SessionState::Stalled,
            SessionState::Complete,
        ];
        for state in states {
            let next = state.transition(Event::InterlockTripped(TripCause::Manual));
            assert_eq!(next, SessionState::Aborted(TripCause::Manual));
        }
    }

    #[test]
    fn test_aborted_latches_until_reset() {
        let s = SessionState::Aborted(TripCause::Redline { interlock: 0 });
        assert_eq!(s.transition(Event::HoldReleased), s);
        assert_eq!(s.transition(Event::WindowExited), s);
        assert_eq!(s.transition(Event::InterlockReset), SessionState::Idle);
    }

    #[test]
    fn test_shutdown_is_terminal() {
        let s = SessionState::Counting.transition(Event::ShutdownRequested);
        assert_eq!(s, SessionState::Shutdown);
        assert_eq!(s.transition(Event::InterlockReset), SessionState::Shutdown);
    }

    #[test]
    fn test_complete_until_rewind() {
        let s = SessionState::Complete;
        assert_eq!(s.transition(Event::HoldReleased), SessionState::Complete);
        assert_eq!(s.transition(Event::WindowExited), SessionState::Idle);
    }

    #[test]
    fn test_status_codes_distinct() {
        let states = [
            SessionState::Idle,
            SessionState::Holding(HoldReason::NotArmed),
            SessionState::Counting,
            SessionState::Validating,
            SessionState::Stalled,
            SessionState::Aborted(TripCause::Manual),
            SessionState::Complete,
            SessionState::Shutdown,
        ];
        for (i, s) in states.iter().enumerate() {
            assert_eq!(s.code() as usize, i);
        }
    }
}
