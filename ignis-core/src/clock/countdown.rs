//! Countdown clock
//!
//! Relative T-time source. While running, T-time advances with the
//! monotonic reference supplied by the caller; while paused it is frozen.
//!
//! computed = running ? (now - reference + offset) : offset

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Clock adjustment errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// Delta was NaN or infinite
    NonFinite,
    /// Delta would overflow the T-time range
    OutOfRange,
}

impl core::fmt::Display for ClockError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClockError::NonFinite => f.write_str("non-finite clock adjustment"),
            ClockError::OutOfRange => f.write_str("clock adjustment out of range"),
        }
    }
}

/// Countdown clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CountdownClock {
    /// T-time at the reference instant (ms)
    offset_ms: i64,
    /// Clock advancing
    running: bool,
    /// Monotonic instant the offset was captured at (ms)
    reference_ms: i64,
}

impl CountdownClock {
    /// Create a paused clock showing `start_ms`
    pub const fn new(start_ms: i64) -> Self {
        Self {
            offset_ms: start_ms,
            running: false,
            reference_ms: 0,
        }
    }

    /// Current T-time in milliseconds
    ///
    /// Pure read. A `now_ms` earlier than the reference (a caller bug) is
    /// treated as the reference instant so T-time never runs backwards.
    pub fn tick(&self, now_ms: i64) -> i64 {
        if self.running {
            let elapsed = now_ms.saturating_sub(self.reference_ms).max(0);
            self.offset_ms.saturating_add(elapsed)
        } else {
            self.offset_ms
        }
    }

    /// Check if the clock is advancing
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Start or stop the clock
    ///
    /// Both transitions capture the current T-time into the offset, so the
    /// resumed clock continues exactly where it was frozen.
    ///
    /// Returns true if the running state changed.
    pub fn set_running(&mut self, run: bool, now_ms: i64) -> bool {
        if run == self.running {
            return false;
        }
        self.offset_ms = self.tick(now_ms);
        self.reference_ms = now_ms;
        self.running = run;
        true
    }

    /// Shift T-time by `delta_ms`
    ///
    /// Rejected without mutation for non-finite or overflowing deltas.
    pub fn adjust(&mut self, delta_ms: f64) -> Result<(), ClockError> {
        if !delta_ms.is_finite() {
            return Err(ClockError::NonFinite);
        }
        // i64 range as f64 is inexact at the edges; stay well inside
        if !(-9.0e15..9.0e15).contains(&delta_ms) {
            return Err(ClockError::OutOfRange);
        }
        let delta = delta_ms as i64;
        let offset = self
            .offset_ms
            .checked_add(delta)
            .ok_or(ClockError::OutOfRange)?;
        self.offset_ms = offset;
        Ok(())
    }

    /// Move the clock to an absolute T-time
    pub fn set(&mut self, target_ms: i64, now_ms: i64) -> Result<(), ClockError> {
        let delta = (target_ms as i128) - (self.tick(now_ms) as i128);
        self.adjust(delta as f64)
    }
}

impl Default for CountdownClock {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_paused_clock_is_frozen() {
        let clock = CountdownClock::new(-30_000);
        assert_eq!(clock.tick(0), -30_000);
        assert_eq!(clock.tick(5_000), -30_000);
    }

    #[test]
    fn test_running_clock_advances() {
        let mut clock = CountdownClock::new(-30_000);
        clock.set_running(true, 1_000);
        assert_eq!(clock.tick(1_000), -30_000);
        assert_eq!(clock.tick(3_500), -27_500);
    }

    #[test]
    fn test_pause_resume_continuity() {
        let mut clock = CountdownClock::new(-30_000);
        clock.set_running(true, 0);
        clock.set_running(false, 4_000);
        assert_eq!(clock.tick(9_000), -26_000);

        // Resume after a long hold: no jump
        clock.set_running(true, 60_000);
        assert_eq!(clock.tick(60_000), -26_000);
        assert_eq!(clock.tick(61_000), -25_000);
    }

    #[test]
    fn test_set_running_idempotent() {
        let mut clock = CountdownClock::new(0);
        assert!(clock.set_running(true, 0));
        assert!(!clock.set_running(true, 500));
        // A redundant start must not reset the reference
        assert_eq!(clock.tick(1_000), 1_000);
    }

    #[test]
    fn test_adjust_while_running() {
        let mut clock = CountdownClock::new(-10_000);
        clock.set_running(true, 0);
        clock.adjust(-5_000.0).unwrap();
        assert_eq!(clock.tick(1_000), -14_000);
    }

    #[test]
    fn test_adjust_rejects_non_finite() {
        let mut clock = CountdownClock::new(-10_000);
        assert_eq!(clock.adjust(f64::NAN), Err(ClockError::NonFinite));
        assert_eq!(clock.adjust(f64::INFINITY), Err(ClockError::NonFinite));
        assert_eq!(clock.tick(0), -10_000);
    }

    #[test]
    fn test_adjust_rejects_overflow() {
        let mut clock = CountdownClock::new(i64::MAX - 10);
        assert_eq!(clock.adjust(100.0), Err(ClockError::OutOfRange));
        assert_eq!(clock.adjust(1.0e300), Err(ClockError::OutOfRange));
        assert_eq!(clock.tick(0), i64::MAX - 10);
    }

    #[test]
    fn test_set_absolute() {
        let mut clock = CountdownClock::new(0);
        clock.set_running(true, 0);
        clock.set(-26_000, 2_000).unwrap();
        assert_eq!(clock.tick(2_000), -26_000);
        assert_eq!(clock.tick(3_000), -25_000);
    }

    #[test]
    fn test_time_before_reference_does_not_rewind() {
        let mut clock = CountdownClock::new(0);
        clock.set_running(true, 10_000);
        assert_eq!(clock.tick(9_000), 0);
    }

    proptest! {
        #[test]
        fn prop_running_is_non_decreasing(
            start in -100_000i64..100_000,
            steps in proptest::collection::vec(0i64..5_000, 1..50),
        ) {
            let mut clock = CountdownClock::new(start);
            clock.set_running(true, 0);
            let mut now = 0i64;
            let mut last = clock.tick(now);
            for step in steps {
                now += step;
                let t = clock.tick(now);
                prop_assert!(t >= last);
                last = t;
            }
        }

        #[test]
        fn prop_pause_freezes_and_resume_is_continuous(
            start in -100_000i64..100_000,
            run_for in 0i64..50_000,
            hold_for in 0i64..50_000,
            after in 0i64..50_000,
        ) {
            let mut clock = CountdownClock::new(start);
            clock.set_running(true, 0);
            clock.set_running(false, run_for);
            let frozen = clock.tick(run_for);
            prop_assert_eq!(clock.tick(run_for + hold_for), frozen);

            clock.set_running(true, run_for + hold_for);
            prop_assert_eq!(clock.tick(run_for + hold_for), frozen);
            prop_assert_eq!(clock.tick(run_for + hold_for + after), frozen + after);
        }
    }
}
