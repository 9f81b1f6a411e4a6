//! In-memory gateway for unit tests

use std::vec::Vec;

use crate::traits::{ActuationGateway, Authority, GatewayError, InputId, OutputId, OutputState};

/// One accepted write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Write {
    pub output: OutputId,
    pub state: OutputState,
    pub authority: Authority,
    pub pulse_ms: Option<u32>,
}

/// Records writes; pulses are applied instantly (energize then release)
pub struct MockGateway {
    states: Vec<Option<OutputState>>,
    failing: Vec<bool>,
    pub writes: Vec<Write>,
    pub inputs: Vec<Option<f32>>,
}

impl MockGateway {
    pub fn new(outputs: usize) -> Self {
        Self {
            states: std::vec![None; outputs],
            failing: std::vec![false; outputs],
            writes: Vec::new(),
            inputs: std::vec![None; 16],
        }
    }

    pub fn fail_output(&mut self, id: OutputId, fail: bool) {
        self.failing[id.0 as usize] = fail;
    }

    pub fn writes_to(&self, id: OutputId) -> usize {
        self.writes.iter().filter(|w| w.output == id).count()
    }

    pub fn last_authority(&self, id: OutputId) -> Option<Authority> {
        self.writes
            .iter()
            .rev()
            .find(|w| w.output == id)
            .map(|w| w.authority)
    }

    pub fn state(&self, id: OutputId) -> Option<OutputState> {
        self.states.get(id.0 as usize).copied().flatten()
    }

    fn check(&self, id: OutputId) -> Result<(), GatewayError> {
        match self.failing.get(id.0 as usize) {
            None => Err(GatewayError::UnknownOutput(id)),
            Some(true) => Err(GatewayError::LinkDown),
            Some(false) => Ok(()),
        }
    }
}

impl ActuationGateway for MockGateway {
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        self.check(id)?;
        self.states[id.0 as usize] = Some(state);
        self.writes.push(Write {
            output: id,
            state,
            authority,
            pulse_ms: None,
        });
        Ok(())
    }

    fn pulse(
        &mut self,
        id: OutputId,
        duration_ms: u32,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        self.check(id)?;
        self.states[id.0 as usize] = Some(OutputState::Deenergized);
        self.writes.push(Write {
            output: id,
            state: OutputState::Energized,
            authority,
            pulse_ms: Some(duration_ms),
        });
        Ok(())
    }

    fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError> {
        self.inputs
            .get(id.0 as usize)
            .ok_or(GatewayError::UnknownInput(id))?
            .ok_or(GatewayError::NoData(id))
    }

    fn output_state(&self, id: OutputId) -> Option<OutputState> {
        self.state(id)
    }
}
