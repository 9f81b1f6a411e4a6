//! Linear pressure transducer
//!
//! Converts raw transducer volts to engineering units using the input's
//! configured [`LinearScale`]: `(volts * slope + offset) - zero_offset`.
//! Inputs without a scale are passed through unchanged.

use ignis_core::config::{InputConfig, LinearScale};

/// Conversion errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Raw reading is NaN or infinite
    NotFinite,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorError::NotFinite => f.write_str("reading not finite"),
        }
    }
}

/// Scaling for one telemetry input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureTransducer {
    scale: Option<LinearScale>,
}

impl PressureTransducer {
    pub const fn new(scale: LinearScale) -> Self {
        Self { scale: Some(scale) }
    }

    /// Identity conversion for inputs already in engineering units
    pub const fn passthrough() -> Self {
        Self { scale: None }
    }

    pub fn from_config(input: &InputConfig) -> Self {
        Self { scale: input.scale }
    }

    pub fn scale(&self) -> Option<LinearScale> {
        self.scale
    }

    /// Raw reading to engineering units
    pub fn convert(&self, raw: f32) -> Result<f32, SensorError> {
        if !raw.is_finite() {
            return Err(SensorError::NotFinite);
        }
        let value = match self.scale {
            Some(s) => (raw * s.slope + s.offset) - s.zero_offset,
            None => raw,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(SensorError::NotFinite)
        }
    }

    /// Zero the transducer at the current raw reading
    ///
    /// Ignored for passthrough inputs.
    pub fn tare(&mut self, raw: f32) -> Result<(), SensorError> {
        if !raw.is_finite() {
            return Err(SensorError::NotFinite);
        }
        if let Some(s) = self.scale.as_mut() {
            s.zero_offset = raw * s.slope + s.offset;
        }
        Ok(())
    }
}
