//! Telemetry interlock conditions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ConfigFault, InterlockConfig, Label, Limit, Threshold};
use crate::traits::{InputId, TelemetrySnapshot};

/// Why the monitor tripped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TripCause {
    /// Interlock at this index crossed its threshold
    Redline { interlock: u8 },
    /// Operator abort
    Manual,
}

/// One watched threshold
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterlockCondition {
    pub label: Label,
    pub input: InputId,
    pub limit: Limit,
    pub threshold: Threshold,
    /// Last value seen
    pub current: Option<f32>,
    /// Sticky until reset
    pub tripped: bool,
}

impl InterlockCondition {
    pub fn new(config: &InterlockConfig) -> Self {
        Self {
            label: config.label.clone(),
            input: config.input,
            limit: config.limit,
            threshold: config.threshold,
            current: None,
            tripped: false,
        }
    }

    /// Check whether `value` is past the limit
    pub fn exceeded_by(&self, value: f32) -> Result<bool, ConfigFault> {
        let Some(limit) = self.threshold.resolve(self.input)? else {
            return Ok(false);
        };
        Ok(match self.limit {
            Limit::Above => value > limit,
            Limit::Below => value < limit,
        })
    }

    /// Update from a snapshot; returns true on a new trip
    ///
    /// A condition with no reading yet cannot trip.
    pub fn evaluate(&mut self, snapshot: &TelemetrySnapshot) -> Result<bool, ConfigFault> {
        let Some(value) = snapshot.get(self.input) else {
            return Ok(false);
        };
        self.current = Some(value);
        if self.tripped {
            return Ok(false);
        }
        if self.exceeded_by(value)? {
            self.tripped = true;
            return Ok(true);
        }
        Ok(false)
    }

    /// Still past the limit at the last reading
    pub fn still_exceeded(&self) -> bool {
        self.current
            .map(|v| self.exceeded_by(v).unwrap_or(true))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::make_label;

    fn redline(threshold: Threshold) -> InterlockCondition {
        InterlockCondition::new(&InterlockConfig {
            label: make_label("OX_TANK"),
            input: InputId(0),
            limit: Limit::Above,
            threshold,
        })
    }

    #[test]
    fn test_above_is_strict() {
        let c = redline(Threshold::Value(500.0));
        assert_eq!(c.exceeded_by(500.0), Ok(false));
        assert_eq!(c.exceeded_by(500.1), Ok(true));
    }

    #[test]
    fn test_below_limit() {
        let c = InterlockCondition::new(&InterlockConfig {
            label: make_label("COPV"),
            input: InputId(1),
            limit: Limit::Below,
            threshold: Threshold::Value(4_500.0),
        });
        assert_eq!(c.exceeded_by(4_499.0), Ok(true));
        assert_eq!(c.exceeded_by(4_500.0), Ok(false));
    }

    #[test]
    fn test_trip_is_sticky() {
        let mut c = redline(Threshold::Value(500.0));
        assert_eq!(
            c.evaluate(&TelemetrySnapshot::new().with(InputId(0), 600.0)),
            Ok(true)
        );
        // Only reported once
        assert_eq!(
            c.evaluate(&TelemetrySnapshot::new().with(InputId(0), 700.0)),
            Ok(false)
        );
        c.evaluate(&TelemetrySnapshot::new().with(InputId(0), 100.0))
            .unwrap();
        assert!(c.tripped);
        assert!(!c.still_exceeded());
    }

    #[test]
    fn test_disabled_never_trips() {
        let mut c = redline(Threshold::Disabled);
        assert_eq!(
            c.evaluate(&TelemetrySnapshot::new().with(InputId(0), 1.0e9)),
            Ok(false)
        );
    }

    #[test]
    fn test_unset_is_fault() {
        let mut c = redline(Threshold::Unset);
        assert_eq!(
            c.evaluate(&TelemetrySnapshot::new().with(InputId(0), 1.0)),
            Err(ConfigFault::UnsetThreshold(InputId(0)))
        );
        assert!(c.still_exceeded());
    }
}
