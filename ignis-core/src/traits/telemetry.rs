//! Telemetry snapshot
//!
//! A copy of the latest value of every configured input, taken at a tick
//! boundary. Guards and interlocks read only from a snapshot, never from
//! the live feed.

use super::gateway::InputId;

/// Maximum number of telemetry inputs
pub const MAX_INPUTS: usize = 16;

/// Latest value per input; `None` until the first update arrives
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetrySnapshot {
    values: [Option<f32>; MAX_INPUTS],
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySnapshot {
    /// Create an empty snapshot
    pub const fn new() -> Self {
        Self {
            values: [None; MAX_INPUTS],
        }
    }

    /// Latest value of an input
    pub fn get(&self, id: InputId) -> Option<f32> {
        self.values.get(id.0 as usize).copied().flatten()
    }

    /// Record a new value; non-finite values and out-of-range ids are dropped
    ///
    /// Returns true if the value was stored.
    pub fn update(&mut self, id: InputId, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self.values.get_mut(id.0 as usize) {
            Some(slot) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Builder-style update for tests and fixtures
    pub fn with(mut self, id: InputId, value: f32) -> Self {
        self.update(id, value);
        self
    }

    /// Forget the value of an input
    pub fn clear(&mut self, id: InputId) {
        if let Some(slot) = self.values.get_mut(id.0 as usize) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_and_get() {
        let mut snap = TelemetrySnapshot::new();
        assert_eq!(snap.get(InputId(2)), None);
        assert!(snap.update(InputId(2), 3100.0));
        assert_eq!(snap.get(InputId(2)), Some(3100.0));
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut snap = TelemetrySnapshot::new();
        assert!(!snap.update(InputId(0), f32::NAN));
        assert!(!snap.update(InputId(0), f32::INFINITY));
        assert_eq!(snap.get(InputId(0)), None);
    }

    #[test]
    fn test_out_of_range_id() {
        let mut snap = TelemetrySnapshot::new();
        assert!(!snap.update(InputId(MAX_INPUTS as u8), 1.0));
        assert_eq!(snap.get(InputId(200)), None);
    }
}
