//! Pressure band checks

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{BandCheckConfig, ConfigFault};
use crate::traits::{InputId, TelemetrySnapshot};

/// Open interval a reading must fall inside
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Band {
    pub lower: f32,
    pub upper: f32,
}

impl Band {
    /// Both bounds shifted down by `margin`
    pub fn from_setpoints(lower_setpoint: f32, upper_setpoint: f32, margin: f32) -> Self {
        Self {
            lower: lower_setpoint - margin,
            upper: upper_setpoint - margin,
        }
    }

    /// Bounds are exclusive
    pub fn contains(&self, value: f32) -> bool {
        value > self.lower && value < self.upper
    }
}

/// One monitored input with its resolved band
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BandCheck {
    pub input: InputId,
    /// `None` when a setpoint is missing
    pub band: Option<Band>,
}

impl BandCheck {
    /// Resolve a configured check with the current margin
    pub fn resolve(config: &BandCheckConfig, margin: f32) -> Self {
        let band = match (config.lower_setpoint, config.upper_setpoint) {
            (Some(lower), Some(upper)) if lower.is_finite() && upper.is_finite() => {
                Some(Band::from_setpoints(lower, upper, margin))
            }
            _ => None,
        };
        Self {
            input: config.input,
            band,
        }
    }

    /// Check the latest reading
    ///
    /// A missing band is a fault; a missing reading is simply out of band.
    pub fn in_band(&self, snapshot: &TelemetrySnapshot) -> Result<bool, ConfigFault> {
        let band = self.band.ok_or(ConfigFault::MissingSetpoint(self.input))?;
        Ok(snapshot.get(self.input).is_some_and(|v| band.contains(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_margin() {
        let band = Band::from_setpoints(3_015.0, 3_215.0, 15.0);
        assert_eq!(band, Band { lower: 3_000.0, upper: 3_200.0 });
    }

    #[test]
    fn test_band_is_exclusive() {
        let band = Band { lower: 3_000.0, upper: 3_200.0 };
        assert!(!band.contains(3_000.0));
        assert!(band.contains(3_000.5));
        assert!(band.contains(3_199.9));
        assert!(!band.contains(3_200.0));
    }

    #[test]
    fn test_missing_setpoint_is_fault() {
        let check = BandCheck::resolve(
            &BandCheckConfig {
                input: InputId(1),
                lower_setpoint: Some(3_000.0),
                upper_setpoint: None,
            },
            15.0,
        );
        let snap = TelemetrySnapshot::new().with(InputId(1), 3_100.0);
        assert_eq!(
            check.in_band(&snap),
            Err(ConfigFault::MissingSetpoint(InputId(1)))
        );
    }

    #[test]
    fn test_missing_reading_is_out_of_band() {
        let check = BandCheck::resolve(
            &BandCheckConfig {
                input: InputId(1),
                lower_setpoint: Some(3_000.0),
                upper_setpoint: Some(3_200.0),
            },
            0.0,
        );
        assert_eq!(check.in_band(&TelemetrySnapshot::new()), Ok(false));
    }
}
