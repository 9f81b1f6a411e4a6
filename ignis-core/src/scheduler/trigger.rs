//! Trigger table entries
//!
//! An event is due once T-time passes its offset. It fires when every guard
//! holds, and re-arms when T-time is wound back to or below the offset.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{EventConfig, Label, Threshold};
use crate::traits::{InputId, OutputId, OutputState, TelemetrySnapshot};

/// Maximum guards per event
pub const MAX_GUARDS: usize = 2;

/// Maximum outputs switched by one group action
pub const MAX_GROUP: usize = 4;

/// Declaration index of an event in the trigger table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventId(pub u8);

/// Command issued when an event fires
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Action {
    /// Drive one output to a state
    Set { output: OutputId, state: OutputState },
    /// Energize one output for a duration, then restore its safe state
    Pulse { output: OutputId, duration_ms: u32 },
    /// Drive several outputs to the same state
    SetGroup {
        outputs: Vec<OutputId, MAX_GROUP>,
        state: OutputState,
    },
    /// Log-only milestone
    Mark,
}

/// Fire-time predicate
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Guard {
    /// No condition
    Always,
    /// The validation hold is cleared
    HoldCleared,
    /// Another event has fired in this pass
    AfterEvent(EventId),
    /// Input at or above a threshold
    InputAtLeast { input: InputId, threshold: Threshold },
    /// Input strictly below a threshold
    InputBelow { input: InputId, threshold: Threshold },
}

/// Why a guard could not be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GuardFault {
    /// No value received yet for the input
    NoTelemetry(InputId),
    /// The guard's threshold is missing
    Unconfigured(InputId),
    /// Guard references an event not in the table
    UnknownEvent(EventId),
}

impl core::fmt::Display for GuardFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GuardFault::NoTelemetry(id) => write!(f, "no telemetry on input #{}", id.0),
            GuardFault::Unconfigured(id) => write!(f, "unset threshold on input #{}", id.0),
            GuardFault::UnknownEvent(id) => write!(f, "unknown event #{}", id.0),
        }
    }
}

/// Everything a guard may read
pub struct GuardContext<'a> {
    /// Telemetry at the tick boundary
    pub telemetry: &'a TelemetrySnapshot,
    /// Validation hold state
    pub hold_cleared: bool,
    /// Trigger table, for `AfterEvent`
    pub events: &'a [TriggerEvent],
}

impl Guard {
    /// Evaluate against a tick's context
    pub fn evaluate(&self, ctx: &GuardContext<'_>) -> Result<bool, GuardFault> {
        match *self {
            Guard::Always => Ok(true),
            Guard::HoldCleared => Ok(ctx.hold_cleared),
            Guard::AfterEvent(id) => ctx
                .events
                .iter()
                .find(|e| e.id == id)
                .map(|e| e.fired)
                .ok_or(GuardFault::UnknownEvent(id)),
            Guard::InputAtLeast { input, threshold } => {
                match Self::limit(input, threshold)? {
                    Some(limit) => Ok(Self::read(ctx, input)? >= limit),
                    None => Ok(true),
                }
            }
            Guard::InputBelow { input, threshold } => match Self::limit(input, threshold)? {
                Some(limit) => Ok(Self::read(ctx, input)? < limit),
                None => Ok(true),
            },
        }
    }

    fn limit(input: InputId, threshold: Threshold) -> Result<Option<f32>, GuardFault> {
        threshold
            .resolve(input)
            .map_err(|_| GuardFault::Unconfigured(input))
    }

    fn read(ctx: &GuardContext<'_>, input: InputId) -> Result<f32, GuardFault> {
        ctx.telemetry
            .get(input)
            .ok_or(GuardFault::NoTelemetry(input))
    }
}

/// Evaluate a guard list; all must hold
pub fn guards_hold(guards: &[Guard], ctx: &GuardContext<'_>) -> Result<bool, GuardFault> {
    for guard in guards {
        if !guard.evaluate(ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Live trigger table row
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerEvent {
    /// Declaration index
    pub id: EventId,
    /// Name used in log lines
    pub label: Label,
    /// T-time the event is due after (ms)
    pub offset_ms: i64,
    /// Command
    pub action: Action,
    /// Fire-time predicates
    pub guards: Vec<Guard, MAX_GUARDS>,
    /// Fired in the current pass
    pub fired: bool,
    /// A fault has been logged and not yet cleared
    pub faulted: bool,
}

impl TriggerEvent {
    /// Build an unfired row from configuration
    pub fn from_config(id: EventId, config: &EventConfig) -> Self {
        Self {
            id,
            label: config.label.clone(),
            offset_ms: config.offset_ms,
            action: config.action.clone(),
            guards: config.guards.clone(),
            fired: false,
            faulted: false,
        }
    }

    /// Check if T-time has passed the offset
    pub fn is_due(&self, current_t: i64) -> bool {
        current_t > self.offset_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::make_label;

    fn event(id: u8, fired: bool) -> TriggerEvent {
        TriggerEvent {
            id: EventId(id),
            label: make_label("E"),
            offset_ms: 0,
            action: Action::Mark,
            guards: Vec::new(),
            fired,
            faulted: false,
        }
    }

    #[test]
    fn test_due_is_strict() {
        let e = event(0, false);
        assert!(!e.is_due(0));
        assert!(e.is_due(1));
        assert!(!e.is_due(-1));
    }

    #[test]
    fn test_input_guards() {
        let snap = TelemetrySnapshot::new().with(InputId(1), 4_600.0);
        let ctx = GuardContext {
            telemetry: &snap,
            hold_cleared: false,
            events: &[],
        };
        let at_least = Guard::InputAtLeast {
            input: InputId(1),
            threshold: Threshold::Value(4_500.0),
        };
        let below = Guard::InputBelow {
            input: InputId(1),
            threshold: Threshold::Value(4_600.0),
        };
        assert_eq!(at_least.evaluate(&ctx), Ok(true));
        assert_eq!(below.evaluate(&ctx), Ok(false));
        assert_eq!(Guard::HoldCleared.evaluate(&ctx), Ok(false));
    }

    #[test]
    fn test_missing_telemetry_is_fault() {
        let snap = TelemetrySnapshot::new();
        let ctx = GuardContext {
            telemetry: &snap,
            hold_cleared: true,
            events: &[],
        };
        let g = Guard::InputAtLeast {
            input: InputId(2),
            threshold: Threshold::Value(1.0),
        };
        assert_eq!(g.evaluate(&ctx), Err(GuardFault::NoTelemetry(InputId(2))));
    }

    #[test]
    fn test_unset_threshold_fails_closed() {
        let snap = TelemetrySnapshot::new().with(InputId(0), 10.0);
        let ctx = GuardContext {
            telemetry: &snap,
            hold_cleared: true,
            events: &[],
        };
        let g = Guard::InputBelow {
            input: InputId(0),
            threshold: Threshold::Unset,
        };
        assert_eq!(g.evaluate(&ctx), Err(GuardFault::Unconfigured(InputId(0))));
    }

    #[test]
    fn test_after_event() {
        let snap = TelemetrySnapshot::new();
        let events = [event(0, true), event(1, false)];
        let ctx = GuardContext {
            telemetry: &snap,
            hold_cleared: true,
            events: &events,
        };
        assert_eq!(Guard::AfterEvent(EventId(0)).evaluate(&ctx), Ok(true));
        assert_eq!(Guard::AfterEvent(EventId(1)).evaluate(&ctx), Ok(false));
        assert_eq!(
            Guard::AfterEvent(EventId(9)).evaluate(&ctx),
            Err(GuardFault::UnknownEvent(EventId(9)))
        );
    }

    #[test]
    fn test_guards_hold_short_circuits() {
        let snap = TelemetrySnapshot::new();
        let ctx = GuardContext {
            telemetry: &snap,
            hold_cleared: false,
            events: &[],
        };
        // HoldCleared is false, so the faulting input guard is never read
        let guards = [
            Guard::HoldCleared,
            Guard::InputAtLeast {
                input: InputId(0),
                threshold: Threshold::Value(1.0),
            },
        ];
        assert_eq!(guards_hold(&guards, &ctx), Ok(false));
    }
}
