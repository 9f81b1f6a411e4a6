//! In-memory valve simulator
//!
//! Each commanded wire level is mirrored to a feedback level, so state
//! readback behaves like a bench where every solenoid follows its command.
//! Telemetry inputs are set directly by the host or a test.

use heapless::HistoryBuffer;
use ignis_core::config::{PointTable, MAX_OUTPUTS};
use ignis_core::traits::{
    ActuationGateway, Authority, GatewayError, InputId, OutputId, OutputState, TelemetrySnapshot,
};

use super::{DeferredRelease, PendingRelease, ReleaseQueue};

/// Writes kept in the simulator history
pub const SIM_HISTORY: usize = 64;

/// One recorded write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimWrite {
    pub output: OutputId,
    pub state: OutputState,
    pub authority: Authority,
}

/// Simulated test stand
pub struct SimGateway {
    points: PointTable,
    /// Wire level per output, as the bench would report it
    feedback: [Option<u8>; MAX_OUTPUTS],
    inputs: TelemetrySnapshot,
    history: HistoryBuffer<SimWrite, SIM_HISTORY>,
    releases: ReleaseQueue,
    offline: bool,
}

impl SimGateway {
    pub fn new(points: PointTable) -> Self {
        Self {
            points,
            feedback: [None; MAX_OUTPUTS],
            inputs: TelemetrySnapshot::new(),
            history: HistoryBuffer::new(),
            releases: ReleaseQueue::new(),
            offline: false,
        }
    }

    pub fn points(&self) -> &PointTable {
        &self.points
    }

    /// Set a telemetry value
    pub fn set_input(&mut self, id: InputId, value: f32) {
        self.inputs.update(id, value);
    }

    pub fn inputs(&self) -> &TelemetrySnapshot {
        &self.inputs
    }

    /// Simulate a dropped command link
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Raw feedback level of an output
    pub fn wire_level(&self, id: OutputId) -> Option<u8> {
        self.feedback.get(id.0 as usize).copied().flatten()
    }

    /// Recorded writes, oldest first
    pub fn history(&self) -> impl Iterator<Item = &SimWrite> {
        self.history.oldest_ordered()
    }

    /// Times `id` was driven to `state`
    pub fn count(&self, id: OutputId, state: OutputState) -> usize {
        self.history()
            .filter(|w| w.output == id && w.state == state)
            .count()
    }
}

impl ActuationGateway for SimGateway {
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        let inverted = self
            .points
            .output(id)
            .ok_or(GatewayError::UnknownOutput(id))?
            .inverted;
        if self.offline {
            return Err(GatewayError::LinkDown);
        }
        self.feedback[id.0 as usize] = Some(state.wire_level(inverted));
        self.history.write(SimWrite {
            output: id,
            state,
            authority,
        });
        Ok(())
    }

    fn pulse(
        &mut self,
        id: OutputId,
        duration_ms: u32,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        let safe = self
            .points
            .output(id)
            .ok_or(GatewayError::UnknownOutput(id))?
            .safe_state;
        self.set_output(id, safe.opposite(), authority)?;
        if let Err(e) = self.releases.push(PendingRelease {
            output: id,
            duration_ms,
            authority,
        }) {
            self.set_output(id, safe, authority)?;
            return Err(e);
        }
        Ok(())
    }

    fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError> {
        if self.points.input(id).is_none() {
            return Err(GatewayError::UnknownInput(id));
        }
        self.inputs.get(id).ok_or(GatewayError::NoData(id))
    }

    fn output_state(&self, id: OutputId) -> Option<OutputState> {
        let inverted = self.points.output(id)?.inverted;
        self.wire_level(id)
            .map(|level| OutputState::from_wire_level(level, inverted))
    }
}

impl DeferredRelease for SimGateway {
    fn take_release(&mut self) -> Option<PendingRelease> {
        self.releases.pop()
    }

    fn release(&mut self, pending: PendingRelease) -> Result<(), GatewayError> {
        let safe = self
            .points
            .output(pending.output)
            .ok_or(GatewayError::UnknownOutput(pending.output))?
            .safe_state;
        self.set_output(pending.output, safe, pending.authority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignis_core::config::{make_label, OutputConfig};

    fn sim() -> SimGateway {
        let mut p = PointTable::new();
        let _ = p.outputs.push(OutputConfig {
            name: make_label("DELUGE_cmd"),
            safe_state: OutputState::Deenergized,
            inverted: true,
            safing_rank: Some(0),
        });
        SimGateway::new(p)
    }

    #[test]
    fn test_feedback_follows_command() {
        let mut gw = sim();
        assert_eq!(gw.output_state(OutputId(0)), None);
        gw.set_output(OutputId(0), OutputState::Energized, Authority::SEQUENCE)
            .unwrap();
        assert_eq!(gw.wire_level(OutputId(0)), Some(0));
        assert_eq!(gw.output_state(OutputId(0)), Some(OutputState::Energized));
    }

    #[test]
    fn test_offline_write_fails() {
        let mut gw = sim();
        gw.set_offline(true);
        assert_eq!(
            gw.set_output(OutputId(0), OutputState::Energized, Authority::ABORT),
            Err(GatewayError::LinkDown)
        );
        assert_eq!(gw.history().count(), 0);
    }

    #[test]
    fn test_pulse_history() {
        let mut gw = sim();
        gw.pulse(OutputId(0), 250, Authority::SEQUENCE).unwrap();
        let pending = gw.take_release().unwrap();
        gw.release(pending).unwrap();

        let states: std::vec::Vec<OutputState> = gw.history().map(|w| w.state).collect();
        assert_eq!(states, [OutputState::Energized, OutputState::Deenergized]);
        assert_eq!(gw.count(OutputId(0), OutputState::Energized), 1);
    }
}
