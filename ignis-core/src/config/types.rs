//! Sequence configuration types
//!
//! These types are the resolved, index-based form of a launch configuration.
//! Hosts parse their own file format and build a [`SequenceConfig`]; the
//! core only validates cross references.

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::hardware::PointTable;
use crate::scheduler::{Action, EventId, Guard, MAX_GUARDS};
use crate::traits::{Authority, InputId, OutputId};

/// Maximum length of a label or channel name
pub const MAX_LABEL_LEN: usize = 24;

/// Maximum events in a trigger table
pub const MAX_EVENTS: usize = 24;

/// Maximum interlock conditions
pub const MAX_INTERLOCKS: usize = 4;

/// Maximum inputs checked by a validation hold
pub const MAX_BAND_CHECKS: usize = 4;

/// Fixed-capacity label
pub type Label = String<MAX_LABEL_LEN>;

/// Build a label, truncating at the last char boundary that fits
pub fn make_label(s: &str) -> Label {
    let mut label = Label::new();
    for c in s.chars() {
        if label.push(c).is_err() {
            break;
        }
    }
    label
}

/// A configured limit value
///
/// `Unset` is what a loader produces for a missing entry. It is never
/// treated as "no limit": every consumer fails closed on it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Threshold {
    /// Explicitly switched off
    Disabled,
    /// Missing from the configuration
    #[default]
    Unset,
    /// Active limit
    Value(f32),
}

impl Threshold {
    /// Active limit, `None` if disabled, fault if unset
    pub fn resolve(&self, input: InputId) -> Result<Option<f32>, ConfigFault> {
        match self {
            Threshold::Disabled => Ok(None),
            Threshold::Unset => Err(ConfigFault::UnsetThreshold(input)),
            Threshold::Value(v) if v.is_finite() => Ok(Some(*v)),
            Threshold::Value(_) => Err(ConfigFault::UnsetThreshold(input)),
        }
    }

    /// Check if the threshold is missing
    pub fn is_unset(&self) -> bool {
        matches!(self, Threshold::Unset)
    }
}

/// Configuration faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigFault {
    /// A band check has no setpoint for this input
    MissingSetpoint(InputId),
    /// A threshold on this input is unset or non-finite
    UnsetThreshold(InputId),
    /// Reference to an output not in the point table
    UnknownOutput(OutputId),
    /// Reference to an input not in the point table
    UnknownInput(InputId),
    /// Guard references an event not in the table
    UnknownEvent(EventId),
    /// Main hold boundary lies after the window end
    InvalidWindow,
    /// A fixed-capacity table overflowed
    TooManyEntries,
}

impl core::fmt::Display for ConfigFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigFault::MissingSetpoint(id) => write!(f, "missing setpoint for input #{}", id.0),
            ConfigFault::UnsetThreshold(id) => write!(f, "unset threshold on input #{}", id.0),
            ConfigFault::UnknownOutput(id) => write!(f, "unknown output #{}", id.0),
            ConfigFault::UnknownInput(id) => write!(f, "unknown input #{}", id.0),
            ConfigFault::UnknownEvent(id) => write!(f, "unknown event #{}", id.0),
            ConfigFault::InvalidWindow => f.write_str("main hold boundary after window end"),
            ConfigFault::TooManyEntries => f.write_str("table capacity exceeded"),
        }
    }
}

/// One row of the trigger table
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EventConfig {
    /// Name used in log lines
    pub label: Label,
    /// T-time the event is due after (ms)
    pub offset_ms: i64,
    /// What to command
    pub action: Action,
    /// All must hold at fire time
    pub guards: Vec<Guard, MAX_GUARDS>,
}

/// Main hold window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MainHoldConfig {
    /// T-time the hold engages at (ms)
    pub boundary_ms: i64,
    /// T-time the sequence window closes at (ms)
    pub window_end_ms: i64,
}

impl Default for MainHoldConfig {
    fn default() -> Self {
        Self {
            boundary_ms: -20_000,
            window_end_ms: 2_000,
        }
    }
}

/// One monitored input of a validation hold
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandCheckConfig {
    /// Tank pressure input
    pub input: InputId,
    /// Lower setpoint (before margin)
    pub lower_setpoint: Option<f32>,
    /// Upper setpoint or redline (before margin)
    pub upper_setpoint: Option<f32>,
}

/// Bounded-wait validation hold
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ValidationConfig {
    /// Name used in log lines
    pub label: Label,
    /// T-time the check runs after (ms)
    pub trigger_ms: i64,
    /// Maximum wait with the clock paused (ms)
    pub timeout_ms: u32,
    /// Subtracted from both setpoints
    pub margin: f32,
    /// Inputs that must all be inside their band
    pub checks: Vec<BandCheckConfig, MAX_BAND_CHECKS>,
}

/// Trip direction of an interlock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Limit {
    /// Trip when the value rises above the threshold (redline)
    Above,
    /// Trip when the value falls below the threshold
    Below,
}

/// Telemetry interlock
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InterlockConfig {
    /// Name used in log lines
    pub label: Label,
    /// Monitored input
    pub input: InputId,
    /// Trip direction
    pub limit: Limit,
    /// Trip level
    pub threshold: Threshold,
}

/// Pressurant supply permissive (COPV)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SupplyConfig {
    /// Supply pressure input
    pub input: InputId,
    /// Minimum pressure for the clock to run inside the window
    pub minimum: Threshold,
}

/// Authorities used by the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AuthorityConfig {
    /// Scheduled actions
    pub sequence: Authority,
    /// Safing routine
    pub abort: Authority,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            sequence: Authority::SEQUENCE,
            abort: Authority::ABORT,
        }
    }
}

/// Complete configuration of one test attempt
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SequenceConfig {
    /// Session name used for records
    pub name: Label,
    /// T-time shown when the session is created (ms)
    pub start_ms: i64,
    /// Output and input tables
    pub points: PointTable,
    /// Trigger table in declaration order
    pub events: Vec<EventConfig, MAX_EVENTS>,
    /// Main hold window
    pub main_hold: MainHoldConfig,
    /// Optional validation hold
    pub validation: Option<ValidationConfig>,
    /// Telemetry interlocks
    pub interlocks: Vec<InterlockConfig, MAX_INTERLOCKS>,
    /// Optional supply permissive
    pub supply: Option<SupplyConfig>,
    /// Write authorities
    pub authority: AuthorityConfig,
    /// Padding around the test data window (ms)
    pub record_pad_ms: i64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            name: make_label("session"),
            start_ms: -30_000,
            points: PointTable::new(),
            events: Vec::new(),
            main_hold: MainHoldConfig::default(),
            validation: None,
            interlocks: Vec::new(),
            supply: None,
            authority: AuthorityConfig::default(),
            record_pad_ms: 30_000,
        }
    }
}

impl SequenceConfig {
    /// Check every cross reference
    ///
    /// Missing thresholds and setpoints are not reported here; they are
    /// runtime faults that fail closed where they are used.
    pub fn validate(&self) -> Result<(), ConfigFault> {
        if self.main_hold.boundary_ms > self.main_hold.window_end_ms {
            return Err(ConfigFault::InvalidWindow);
        }

        for event in &self.events {
            self.check_action(&event.action)?;
            for guard in &event.guards {
                self.check_guard(guard)?;
            }
        }

        if let Some(validation) = &self.validation {
            for check in &validation.checks {
                self.check_input(check.input)?;
            }
        }

        for interlock in &self.interlocks {
            self.check_input(interlock.input)?;
        }

        if let Some(supply) = &self.supply {
            self.check_input(supply.input)?;
        }

        Ok(())
    }

    fn check_output(&self, id: OutputId) -> Result<(), ConfigFault> {
        self.points
            .output(id)
            .map(|_| ())
            .ok_or(ConfigFault::UnknownOutput(id))
    }

    fn check_input(&self, id: InputId) -> Result<(), ConfigFault> {
        self.points
            .input(id)
            .map(|_| ())
            .ok_or(ConfigFault::UnknownInput(id))
    }

    fn check_action(&self, action: &Action) -> Result<(), ConfigFault> {
        match action {
            Action::Set { output, .. } | Action::Pulse { output, .. } => self.check_output(*output),
            Action::SetGroup { outputs, .. } => {
                outputs.iter().try_for_each(|id| self.check_output(*id))
            }
            Action::Mark => Ok(()),
        }
    }

    fn check_guard(&self, guard: &Guard) -> Result<(), ConfigFault> {
        match guard {
            Guard::Always | Guard::HoldCleared => Ok(()),
            Guard::AfterEvent(id) => {
                if (id.0 as usize) < self.events.len() {
                    Ok(())
                } else {
                    Err(ConfigFault::UnknownEvent(*id))
                }
            }
            Guard::InputAtLeast { input, .. } | Guard::InputBelow { input, .. } => {
                self.check_input(*input)
            }
        }
    }
}
