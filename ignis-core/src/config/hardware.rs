//! Hardware point configuration
//!
//! Name tables for commanded outputs and telemetry inputs. Everything
//! inside the core addresses points by index; the names only matter at
//! the gateway boundary.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::types::Label;
use crate::traits::{InputId, OutputId, OutputState, MAX_INPUTS};

/// Maximum commanded outputs per config
pub const MAX_OUTPUTS: usize = 16;

/// Commanded output (valve solenoid, pyro channel, clock enable)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OutputConfig {
    /// Channel name on the control bus (e.g. "IGNITOR_cmd")
    pub name: Label,
    /// State commanded by the safing routine
    pub safe_state: OutputState,
    /// Channel is active-low on the wire
    pub inverted: bool,
    /// Position in the safing sequence (lower first); `None` = not tracked
    pub safing_rank: Option<u8>,
}

/// Linear engineering-unit scale: `(volts * slope + offset) - zero_offset`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearScale {
    /// Units per volt
    pub slope: f32,
    /// Intercept in engineering units
    pub offset: f32,
    /// Reading subtracted after scaling (tare)
    pub zero_offset: f32,
}

impl Default for LinearScale {
    fn default() -> Self {
        Self {
            slope: 1.0,
            offset: 0.0,
            zero_offset: 0.0,
        }
    }
}

/// Telemetry input (pressure transducer, state feedback)
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InputConfig {
    /// Channel name on the telemetry feed (e.g. "PT_OX_201")
    pub name: Label,
    /// Optional raw-volts scaling applied on receipt
    pub scale: Option<LinearScale>,
}

/// Output and input name tables
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointTable {
    /// Commanded outputs, indexed by [`OutputId`]
    pub outputs: Vec<OutputConfig, MAX_OUTPUTS>,
    /// Telemetry inputs, indexed by [`InputId`]
    pub inputs: Vec<InputConfig, MAX_INPUTS>,
}

impl PointTable {
    /// Create an empty table
    pub const fn new() -> Self {
        Self {
            outputs: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Find an output by name
    pub fn find_output(&self, name: &str) -> Option<OutputId> {
        self.outputs
            .iter()
            .position(|o| o.name.as_str() == name)
            .map(|i| OutputId(i as u8))
    }

    /// Find an input by name
    pub fn find_input(&self, name: &str) -> Option<InputId> {
        self.inputs
            .iter()
            .position(|i| i.name.as_str() == name)
            .map(|i| InputId(i as u8))
    }

    /// Look up an output
    pub fn output(&self, id: OutputId) -> Option<&OutputConfig> {
        self.outputs.get(id.0 as usize)
    }

    /// Look up an input
    pub fn input(&self, id: InputId) -> Option<&InputConfig> {
        self.inputs.get(id.0 as usize)
    }
}
