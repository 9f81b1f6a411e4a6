//! Actuation gateway trait
//!
//! The gateway is the only component allowed to touch physical outputs.
//! Every write carries an [`Authority`] so that automated sequence commands
//! and manual console overrides sharing one output are arbitrated
//! consistently by the external control bus.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Index of a commanded output in the configured output table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputId(pub u8);

/// Index of a telemetry input in the configured input table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputId(pub u8);

/// Logical state of a two-state actuator (valve solenoid, pyro channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OutputState {
    /// Coil powered
    Energized,
    /// Coil unpowered
    #[default]
    Deenergized,
}

impl OutputState {
    /// The other state
    pub const fn opposite(self) -> Self {
        match self {
            OutputState::Energized => OutputState::Deenergized,
            OutputState::Deenergized => OutputState::Energized,
        }
    }

    /// Wire level for this state, honoring an inverted (active-low) channel
    pub const fn wire_level(self, inverted: bool) -> u8 {
        let energized = matches!(self, OutputState::Energized);
        if energized != inverted {
            1
        } else {
            0
        }
    }

    /// Decode a wire level back into a logical state
    pub const fn from_wire_level(level: u8, inverted: bool) -> Self {
        if (level != 0) != inverted {
            OutputState::Energized
        } else {
            OutputState::Deenergized
        }
    }
}

/// Write priority tag
///
/// Only the relative order matters; higher values win arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Authority(pub u8);

impl Authority {
    /// Held while the sequencer is idle so consoles can override freely
    pub const IDLE: Authority = Authority(10);
    /// Raised for the duration of a scheduled action
    pub const SEQUENCE: Authority = Authority(201);
    /// Safing routine; outranks every sequence write
    pub const ABORT: Authority = Authority(202);
}

/// Errors reported by a gateway implementation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GatewayError {
    /// Output id not present in the gateway's table
    UnknownOutput(OutputId),
    /// Input id not present in the gateway's table
    UnknownInput(InputId),
    /// Input known but no value has been received yet
    NoData(InputId),
    /// The command link rejected or failed the write
    LinkDown,
    /// Too many pulses awaiting release
    Busy,
}

impl core::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GatewayError::UnknownOutput(id) => write!(f, "unknown output #{}", id.0),
            GatewayError::UnknownInput(id) => write!(f, "unknown input #{}", id.0),
            GatewayError::NoData(id) => write!(f, "no data yet for input #{}", id.0),
            GatewayError::LinkDown => f.write_str("command link down"),
            GatewayError::Busy => f.write_str("pulse queue full"),
        }
    }
}

/// Prioritized read/write access to named hardware points
pub trait ActuationGateway {
    /// Command an output to a state under the given authority
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError>;

    /// Energize an output for `duration_ms`, then restore its safe state
    ///
    /// Implementations must restore the safe state on every exit path,
    /// including a failed hold or an abort that lands mid-pulse.
    fn pulse(
        &mut self,
        id: OutputId,
        duration_ms: u32,
        authority: Authority,
    ) -> Result<(), GatewayError>;

    /// Read the latest value of an input
    fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError>;

    /// Read back the last commanded state of an output, if known
    fn output_state(&self, id: OutputId) -> Option<OutputState>;
}
