//! Main hold
//!
//! Gates the whole schedule inside the sequence window. Inside the window
//! the clock may only run while every permissive holds; outside it the
//! clearance is dropped so a later pass starts held again.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::MainHoldConfig;

/// Operator and telemetry permissives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Permissives {
    /// Autosequence armed
    pub armed: bool,
    /// Abort monitor armed
    pub abort_armed: bool,
    /// Pressurant supply ready or overridden
    pub supply_ready: bool,
}

/// Why the clock is held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum HoldReason {
    NotArmed,
    AbortNotArmed,
    NotCleared,
    SupplyLow,
}

impl HoldReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldReason::NotArmed => "autosequence not armed",
            HoldReason::AbortNotArmed => "abort not armed",
            HoldReason::NotCleared => "main hold not cleared",
            HoldReason::SupplyLow => "COPV pressure low",
        }
    }
}

/// Outcome of a main hold evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HoldDirective {
    /// T-time outside the window; the hold does not apply
    Inactive,
    /// Clock must be paused
    Hold(HoldReason),
    /// Clock may run
    Proceed,
}

/// Main hold gate
#[derive(Debug, Clone)]
pub struct MainHold {
    config: MainHoldConfig,
    cleared: bool,
}

impl MainHold {
    pub fn new(config: MainHoldConfig) -> Self {
        Self {
            config,
            cleared: false,
        }
    }

    /// T-time the hold engages at
    pub fn boundary_ms(&self) -> i64 {
        self.config.boundary_ms
    }

    /// T-time the window closes at
    pub fn window_end_ms(&self) -> i64 {
        self.config.window_end_ms
    }

    /// Check if `t` lies inside the window
    pub fn in_window(&self, t: i64) -> bool {
        t >= self.config.boundary_ms && t <= self.config.window_end_ms
    }

    /// Operator clearance
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }

    /// Give clearance; returns true if it was not already given
    pub fn clear(&mut self) -> bool {
        !core::mem::replace(&mut self.cleared, true)
    }

    /// Withdraw clearance; returns true if it was given
    pub fn revoke(&mut self) -> bool {
        core::mem::replace(&mut self.cleared, false)
    }

    /// Decide whether the clock may run at `t`
    ///
    /// Permissives are checked in a fixed order so the reported reason is
    /// stable while several are missing.
    pub fn evaluate(&mut self, t: i64, permissives: Permissives) -> HoldDirective {
        if !self.in_window(t) {
            self.cleared = false;
            return HoldDirective::Inactive;
        }

        if !permissives.armed {
            HoldDirective::Hold(HoldReason::NotArmed)
        } else if !permissives.abort_armed {
            HoldDirective::Hold(HoldReason::AbortNotArmed)
        } else if !self.cleared {
            HoldDirective::Hold(HoldReason::NotCleared)
        } else if !permissives.supply_ready {
            HoldDirective::Hold(HoldReason::SupplyLow)
        } else {
            HoldDirective::Proceed
        }
    }
}
