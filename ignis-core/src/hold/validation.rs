//! Validation hold
//!
//! Bounded-wait check of tank pressures before the pyro group. Crossing the
//! trigger with every reading in band clears at once; otherwise the session
//! pauses the clock and keeps polling until the bands are met, the operator
//! overrides, or the deadline passes.
//!
//! ```text
//! Pending --(in band)--------------------------> Cleared
//!    |                                              ^
//!    +--(out of band)--> Waiting --(in band / override)
//!                           |
//!                           +--(deadline)--> Stalled --(retry)--> Pending
//! ```

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::band::BandCheck;
use crate::config::{ConfigFault, Label, ValidationConfig, MAX_BAND_CHECKS};
use crate::traits::TelemetrySnapshot;

/// Validation progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ValidationPhase {
    /// Trigger not yet crossed in this pass
    Pending,
    /// Clock paused, waiting until `deadline_ms` (monotonic)
    Waiting { deadline_ms: i64 },
    /// Condition met or overridden
    Cleared,
    /// Deadline passed; needs an operator retry
    Stalled,
}

/// How the hold was cleared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClearReason {
    /// Every reading in band at the trigger
    InBand,
    /// Readings came into band during the wait
    Settled,
    /// Operator override
    Override,
}

/// Result of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ValidationOutcome {
    /// T-time at or before the trigger
    NotDue,
    /// Wait just started; pause the clock
    Started,
    /// Still waiting
    Waiting,
    /// Cleared on this poll
    Cleared(ClearReason),
    /// Cleared earlier in this pass
    AlreadyCleared,
    /// Deadline passed on this poll
    Stalled,
    /// Stalled earlier, awaiting retry
    StillStalled,
}

/// Hold-related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldError {
    /// No validation hold configured
    NoValidation,
    /// Override only applies while waiting or stalled
    NotHeld,
}

impl core::fmt::Display for HoldError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HoldError::NoValidation => f.write_str("no validation hold configured"),
            HoldError::NotHeld => f.write_str("validation hold is not holding"),
        }
    }
}

/// Bounded-wait validation hold
#[derive(Debug, Clone)]
pub struct ValidationHold {
    label: Label,
    trigger_ms: i64,
    timeout_ms: u32,
    margin: f32,
    checks: Vec<BandCheck, MAX_BAND_CHECKS>,
    phase: ValidationPhase,
    override_requested: bool,
    fault_logged: bool,
}

impl ValidationHold {
    pub fn new(config: &ValidationConfig) -> Self {
        let mut hold = Self {
            label: config.label.clone(),
            trigger_ms: config.trigger_ms,
            timeout_ms: config.timeout_ms,
            margin: config.margin,
            checks: Vec::new(),
            phase: ValidationPhase::Pending,
            override_requested: false,
            fault_logged: false,
        };
        hold.reload(config);
        hold
    }

    /// Re-resolve bands from fresh setpoints and margin
    ///
    /// Progress is kept; only the limits change.
    pub fn reload(&mut self, config: &ValidationConfig) {
        self.margin = config.margin;
        self.timeout_ms = config.timeout_ms;
        self.checks.clear();
        for check in config.checks.iter() {
            let _ = self.checks.push(BandCheck::resolve(check, self.margin));
        }
        self.fault_logged = false;
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn trigger_ms(&self) -> i64 {
        self.trigger_ms
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    pub fn checks(&self) -> &[BandCheck] {
        &self.checks
    }

    pub fn phase(&self) -> ValidationPhase {
        self.phase
    }

    pub fn is_cleared(&self) -> bool {
        self.phase == ValidationPhase::Cleared
    }

    /// Waiting or stalled: the clock must stay paused
    pub fn is_blocking(&self) -> bool {
        matches!(
            self.phase,
            ValidationPhase::Waiting { .. } | ValidationPhase::Stalled
        )
    }

    /// Every band satisfied
    ///
    /// A missing setpoint fails closed.
    pub fn condition_holds(&self, snapshot: &TelemetrySnapshot) -> Result<bool, ConfigFault> {
        for check in &self.checks {
            if !check.in_band(snapshot)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Operator override; takes effect on the next poll while waiting
    pub fn request_override(&mut self) -> Result<(), HoldError> {
        if !self.is_blocking() {
            return Err(HoldError::NotHeld);
        }
        self.override_requested = true;
        if self.phase == ValidationPhase::Stalled {
            // A stalled hold overrides straight to cleared
            self.phase = ValidationPhase::Cleared;
        }
        Ok(())
    }

    /// Stalled back to pending after the main hold is re-cleared
    pub fn retry(&mut self) -> bool {
        if self.phase == ValidationPhase::Stalled {
            self.phase = ValidationPhase::Pending;
            self.override_requested = false;
            true
        } else {
            false
        }
    }

    /// Re-arm if T-time is back at or below the trigger
    pub fn rearm_if_rewound(&mut self, t: i64) -> bool {
        if t <= self.trigger_ms && self.phase != ValidationPhase::Pending {
            self.phase = ValidationPhase::Pending;
            self.override_requested = false;
            true
        } else {
            false
        }
    }

    /// First config fault since the last reload, for one-shot logging
    pub fn take_fault(&mut self, snapshot: &TelemetrySnapshot) -> Option<ConfigFault> {
        if self.fault_logged {
            return None;
        }
        let fault = self.condition_holds(snapshot).err()?;
        self.fault_logged = true;
        Some(fault)
    }

    /// Advance the hold
    ///
    /// `t` is T-time, `now_ms` the monotonic reference the deadline is
    /// measured against (the clock is paused while waiting).
    pub fn poll(&mut self, t: i64, now_ms: i64, snapshot: &TelemetrySnapshot) -> ValidationOutcome {
        if t <= self.trigger_ms {
            self.rearm_if_rewound(t);
            return ValidationOutcome::NotDue;
        }

        let in_band = self.condition_holds(snapshot).unwrap_or(false);

        match self.phase {
            ValidationPhase::Cleared => ValidationOutcome::AlreadyCleared,
            ValidationPhase::Stalled => ValidationOutcome::StillStalled,
            ValidationPhase::Pending => {
                if self.override_requested || in_band {
                    self.phase = ValidationPhase::Cleared;
                    ValidationOutcome::Cleared(ClearReason::InBand)
                } else {
                    self.phase = ValidationPhase::Waiting {
                        deadline_ms: now_ms.saturating_add(self.timeout_ms as i64),
                    };
                    ValidationOutcome::Started
                }
            }
            ValidationPhase::Waiting { deadline_ms } => {
                if self.override_requested {
                    self.phase = ValidationPhase::Cleared;
                    ValidationOutcome::Cleared(ClearReason::Override)
                } else if in_band {
                    self.phase = ValidationPhase::Cleared;
                    ValidationOutcome::Cleared(ClearReason::Settled)
                } else if now_ms >= deadline_ms {
                    self.phase = ValidationPhase::Stalled;
                    ValidationOutcome::Stalled
                } else {
                    ValidationOutcome::Waiting
                }
            }
        }
    }
}
