//! Interlock / abort monitor
//!
//! Watches redlines and the manual abort request. Once armed, any crossing
//! trips the monitor; the trip stays latched until an explicit reset with
//! every condition back inside its limit.

use heapless::Vec;

use super::interlock::{InterlockCondition, TripCause};
use crate::config::{ConfigFault, InterlockConfig, MAX_INTERLOCKS};
use crate::traits::TelemetrySnapshot;

/// Reset refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResetError {
    /// The interlock at this index is still past its limit
    StillExceeded(u8),
}

impl core::fmt::Display for ResetError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResetError::StillExceeded(i) => write!(f, "interlock #{} still exceeded", i),
        }
    }
}

/// Abort monitor
#[derive(Debug, Clone)]
pub struct InterlockMonitor {
    armed: bool,
    conditions: Vec<InterlockCondition, MAX_INTERLOCKS>,
    manual_requested: bool,
    trip: Option<TripCause>,
    last_fault: Option<ConfigFault>,
}

impl InterlockMonitor {
    pub fn new(configs: &[InterlockConfig]) -> Result<Self, ConfigFault> {
        let mut conditions = Vec::new();
        for config in configs {
            conditions
                .push(InterlockCondition::new(config))
                .map_err(|_| ConfigFault::TooManyEntries)?;
        }
        Ok(Self {
            armed: false,
            conditions,
            manual_requested: false,
            trip: None,
            last_fault: None,
        })
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_tripped(&self) -> bool {
        self.trip.is_some()
    }

    pub fn trip_cause(&self) -> Option<TripCause> {
        self.trip
    }

    pub fn conditions(&self) -> &[InterlockCondition] {
        &self.conditions
    }

    /// Config fault behind the latest trip, if any
    pub fn last_fault(&self) -> Option<ConfigFault> {
        self.last_fault
    }

    /// Arm the monitor
    ///
    /// Refused while any threshold is unset.
    pub fn arm(&mut self) -> Result<(), ConfigFault> {
        if let Some(c) = self.conditions.iter().find(|c| c.threshold.is_unset()) {
            return Err(ConfigFault::UnsetThreshold(c.input));
        }
        self.armed = true;
        Ok(())
    }

    /// Disarm; a pending manual request is dropped
    pub fn disarm(&mut self) {
        self.armed = false;
        self.manual_requested = false;
    }

    /// Operator abort; ignored while disarmed
    pub fn request_abort(&mut self) -> bool {
        if self.armed {
            self.manual_requested = true;
        }
        self.armed
    }

    /// Replace thresholds from fresh configuration, matched by position
    pub fn reload(&mut self, configs: &[InterlockConfig]) {
        for (condition, config) in self.conditions.iter_mut().zip(configs) {
            condition.threshold = config.threshold;
            condition.limit = config.limit;
        }
    }

    /// Check the manual request and every condition
    ///
    /// Returns the cause only on the evaluation that trips. A condition
    /// that cannot be evaluated (unset threshold) trips as a redline.
    pub fn evaluate(&mut self, snapshot: &TelemetrySnapshot) -> Option<TripCause> {
        let mut crossing = None;
        for (i, condition) in self.conditions.iter_mut().enumerate() {
            let hit = match condition.evaluate(snapshot) {
                Ok(hit) => hit,
                Err(fault) => {
                    if !self.armed || self.trip.is_some() {
                        continue;
                    }
                    condition.tripped = true;
                    self.last_fault = Some(fault);
                    true
                }
            };
            if hit && crossing.is_none() {
                crossing = Some(TripCause::Redline { interlock: i as u8 });
            }
        }

        if !self.armed {
            // Disarmed: values are tracked but nothing latches
            for condition in self.conditions.iter_mut() {
                condition.tripped = false;
            }
            return None;
        }
        if self.trip.is_some() {
            return None;
        }

        let cause = if self.manual_requested {
            Some(TripCause::Manual)
        } else {
            crossing
        };
        self.trip = cause;
        cause
    }

    /// Clear the latched trip
    ///
    /// Refused while any condition is still past its limit.
    pub fn reset(&mut self) -> Result<(), ResetError> {
        if let Some(i) = self.conditions.iter().position(|c| c.still_exceeded()) {
            return Err(ResetError::StillExceeded(i as u8));
        }
        for condition in self.conditions.iter_mut() {
            condition.tripped = false;
        }
        self.manual_requested = false;
        self.trip = None;
        self.last_fault = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{make_label, Limit, Threshold};
    use crate::traits::InputId;

    fn configs(threshold: Threshold) -> [InterlockConfig; 2] {
        [
            InterlockConfig {
                label: make_label("OX_TANK"),
                input: InputId(0),
                limit: Limit::Above,
                threshold: Threshold::Value(500.0),
            },
            InterlockConfig {
                label: make_label("FU_TANK"),
                input: InputId(1),
                limit: Limit::Above,
                threshold,
            },
        ]
    }

    fn snap(ox: f32, fu: f32) -> TelemetrySnapshot {
        TelemetrySnapshot::new()
            .with(InputId(0), ox)
            .with(InputId(1), fu)
    }

    #[test]
    fn test_arm_refused_with_unset_threshold() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Unset)).unwrap();
        assert_eq!(m.arm(), Err(ConfigFault::UnsetThreshold(InputId(1))));
        assert!(!m.is_armed());
    }

    #[test]
    fn test_disarmed_ignores_trips() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Value(500.0))).unwrap();
        assert_eq!(m.evaluate(&snap(900.0, 0.0)), None);
        assert!(!m.request_abort());
        assert_eq!(m.evaluate(&snap(0.0, 0.0)), None);
        assert!(!m.is_tripped());
    }

    #[test]
    fn test_redline_trips_once() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Value(500.0))).unwrap();
        m.arm().unwrap();
        assert_eq!(m.evaluate(&snap(100.0, 100.0)), None);
        assert_eq!(
            m.evaluate(&snap(100.0, 600.0)),
            Some(TripCause::Redline { interlock: 1 })
        );
        assert_eq!(m.evaluate(&snap(100.0, 700.0)), None);
        assert!(m.is_tripped());
    }

    #[test]
    fn test_manual_abort() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Value(500.0))).unwrap();
        m.arm().unwrap();
        assert!(m.request_abort());
        assert_eq!(m.evaluate(&snap(0.0, 0.0)), Some(TripCause::Manual));
    }

    #[test]
    fn test_reset_requires_clear_conditions() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Value(500.0))).unwrap();
        m.arm().unwrap();
        m.evaluate(&snap(600.0, 0.0));
        assert_eq!(m.reset(), Err(ResetError::StillExceeded(0)));
        m.evaluate(&snap(400.0, 0.0));
        assert!(m.is_tripped());
        assert_eq!(m.reset(), Ok(()));
        assert!(!m.is_tripped());
        assert!(m.is_armed());
    }

    #[test]
    fn test_unset_after_reload_fails_closed() {
        let mut m = InterlockMonitor::new(&configs(Threshold::Value(500.0))).unwrap();
        m.arm().unwrap();
        m.reload(&configs(Threshold::Unset));
        assert_eq!(
            m.evaluate(&snap(0.0, 0.0)),
            Some(TripCause::Redline { interlock: 1 })
        );
        assert_eq!(
            m.last_fault(),
            Some(ConfigFault::UnsetThreshold(InputId(1)))
        );
    }
}
