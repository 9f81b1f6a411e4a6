//! Scoped blocking pulse
//!
//! For hosts that may block for the pulse duration (bench tools, a
//! dedicated actuation thread). The safe state is restored by a drop guard,
//! so an early return or an unwinding panic between energize and release
//! still leaves the output safe.

use embedded_hal::delay::DelayNs;
use ignis_core::traits::{ActuationGateway, Authority, GatewayError, OutputId, OutputState};

/// Restores `safe` on drop unless already released
struct ReleaseGuard<'a, G: ActuationGateway + ?Sized> {
    gateway: &'a mut G,
    output: OutputId,
    safe: OutputState,
    authority: Authority,
    armed: bool,
}

impl<G: ActuationGateway + ?Sized> ReleaseGuard<'_, G> {
    fn release(mut self) -> Result<(), GatewayError> {
        self.armed = false;
        self.gateway.set_output(self.output, self.safe, self.authority)
    }
}

impl<G: ActuationGateway + ?Sized> Drop for ReleaseGuard<'_, G> {
    fn drop(&mut self) {
        if self.armed {
            let _ = self.gateway.set_output(self.output, self.safe, self.authority);
        }
    }
}

/// Energize `output`, hold for `duration_ms`, restore `safe`
///
/// A failed energize still commands the safe state before returning the
/// error.
///
/// Library helper for blocking hosts only. The sequencer process never
/// blocks under its controller lock; it energizes through the gateway and
/// hands the restore to its release task instead.
pub fn pulse_scoped<G, D>(
    gateway: &mut G,
    delay: &mut D,
    output: OutputId,
    safe: OutputState,
    duration_ms: u32,
    authority: Authority,
) -> Result<(), GatewayError>
where
    G: ActuationGateway + ?Sized,
    D: DelayNs,
{
    let mut guard = ReleaseGuard {
        gateway,
        output,
        safe,
        authority,
        armed: true,
    };
    guard
        .gateway
        .set_output(output, safe.opposite(), authority)?;
    delay.delay_ms(duration_ms);
    guard.release()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignis_core::traits::InputId;

    #[derive(Default)]
    struct Recorder {
        writes: std::vec::Vec<OutputState>,
        fail_energize: bool,
    }

    impl ActuationGateway for Recorder {
        fn set_output(
            &mut self,
            _id: OutputId,
            state: OutputState,
            _authority: Authority,
        ) -> Result<(), GatewayError> {
            self.writes.push(state);
            if self.fail_energize && state == OutputState::Energized {
                return Err(GatewayError::LinkDown);
            }
            Ok(())
        }

        fn pulse(&mut self, _: OutputId, _: u32, _: Authority) -> Result<(), GatewayError> {
            Ok(())
        }

        fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError> {
            Err(GatewayError::NoData(id))
        }

        fn output_state(&self, _: OutputId) -> Option<OutputState> {
            self.writes.last().copied()
        }
    }

    struct CountingDelay(u32);

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.0 += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0 += ms;
        }
    }

    #[test]
    fn test_pulse_restores_safe() {
        let mut gw = Recorder::default();
        let mut delay = CountingDelay(0);
        pulse_scoped(
            &mut gw,
            &mut delay,
            OutputId(0),
            OutputState::Deenergized,
            300,
            Authority::SEQUENCE,
        )
        .unwrap();
        assert_eq!(gw.writes, [OutputState::Energized, OutputState::Deenergized]);
        assert_eq!(delay.0, 300);
    }

    #[test]
    fn test_failed_energize_still_restores() {
        let mut gw = Recorder {
            fail_energize: true,
            ..Default::default()
        };
        let mut delay = CountingDelay(0);
        let result = pulse_scoped(
            &mut gw,
            &mut delay,
            OutputId(0),
            OutputState::Deenergized,
            300,
            Authority::SEQUENCE,
        );
        assert_eq!(result, Err(GatewayError::LinkDown));
        assert_eq!(gw.writes, [OutputState::Energized, OutputState::Deenergized]);
        assert_eq!(delay.0, 0);
    }

    #[test]
    fn test_normally_energized_output() {
        let mut gw = Recorder::default();
        let mut delay = CountingDelay(0);
        pulse_scoped(
            &mut gw,
            &mut delay,
            OutputId(0),
            OutputState::Energized,
            50,
            Authority::ABORT,
        )
        .unwrap();
        assert_eq!(gw.writes, [OutputState::Deenergized, OutputState::Energized]);
    }
}
