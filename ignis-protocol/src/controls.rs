//! Operator control channels
//!
//! Controls are virtual points on the telemetry feed. A value update on one
//! of these names is an operator command rather than a sensor reading.
//! Switch channels treat a value of 0.5 or more as "on".

/// Reserved control channel names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlChannel {
    ArmAuto,
    ArmAbort,
    ClearMainHold,
    ClearPrepressHold,
    RunAbort,
    SequenceShutdown,
    PullSetpoints,
    RecordData,
    CopvOverride,
    ClockEnable,
    ClockAddSec,
    RedlineReset,
}

impl ControlChannel {
    pub const ALL: [ControlChannel; 12] = [
        ControlChannel::ArmAuto,
        ControlChannel::ArmAbort,
        ControlChannel::ClearMainHold,
        ControlChannel::ClearPrepressHold,
        ControlChannel::RunAbort,
        ControlChannel::SequenceShutdown,
        ControlChannel::PullSetpoints,
        ControlChannel::RecordData,
        ControlChannel::CopvOverride,
        ControlChannel::ClockEnable,
        ControlChannel::ClockAddSec,
        ControlChannel::RedlineReset,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ControlChannel::ArmAuto => "ARM_AUTO",
            ControlChannel::ArmAbort => "ARM_ABORT",
            ControlChannel::ClearMainHold => "CLEAR_MAIN_HOLD",
            ControlChannel::ClearPrepressHold => "CLEAR_PREPRESS_HOLD",
            ControlChannel::RunAbort => "RUN_ABORT",
            ControlChannel::SequenceShutdown => "SEQUENCE_SHUTDOWN",
            ControlChannel::PullSetpoints => "PULL_BB_SETPOINTS",
            ControlChannel::RecordData => "RECORD_DATA",
            ControlChannel::CopvOverride => "COPV_OVERRIDE",
            ControlChannel::ClockEnable => "SET_T_CLOCK_ENABLE",
            ControlChannel::ClockAddSec => "T_CLOCK_ADD_SEC",
            ControlChannel::RedlineReset => "REDLINE_RESET",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Decode a value update on this channel
    ///
    /// Momentary channels only act on their "on" edge value and yield
    /// `None` otherwise. A non-finite value never decodes.
    pub fn decode(self, value: f32) -> Option<Control> {
        if !value.is_finite() {
            return None;
        }
        let on = value >= 0.5;
        match self {
            ControlChannel::ArmAuto => Some(Control::ArmAuto(on)),
            ControlChannel::ArmAbort => Some(Control::ArmAbort(on)),
            ControlChannel::ClearMainHold => Some(Control::ClearMainHold(on)),
            ControlChannel::RecordData => Some(Control::RecordData(on)),
            ControlChannel::CopvOverride => Some(Control::SupplyOverride(on)),
            ControlChannel::ClockEnable => Some(Control::ClockEnable(on)),
            ControlChannel::ClockAddSec => Some(Control::ClockAddSec(value)),
            ControlChannel::ClearPrepressHold => on.then_some(Control::OverrideValidation),
            ControlChannel::RunAbort => on.then_some(Control::Abort),
            ControlChannel::SequenceShutdown => on.then_some(Control::Shutdown),
            ControlChannel::PullSetpoints => on.then_some(Control::ReloadSetpoints),
            ControlChannel::RedlineReset => on.then_some(Control::ResetInterlocks),
        }
    }
}

/// A decoded operator command
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Control {
    ArmAuto(bool),
    ArmAbort(bool),
    ClearMainHold(bool),
    OverrideValidation,
    Abort,
    Shutdown,
    ReloadSetpoints,
    RecordData(bool),
    SupplyOverride(bool),
    ClockEnable(bool),
    /// Seconds to add to T-time; negative rewinds
    ClockAddSec(f32),
    ResetInterlocks,
}

impl Control {
    /// Decode a feed update; `None` for sensor channels
    pub fn from_update(name: &str, value: f32) -> Option<Self> {
        ControlChannel::from_name(name)?.decode(value)
    }
}
