//! Safing routine
//!
//! One fixed list of (output, safe state) commands in declared order.
//! Every step is attempted even when an earlier one fails.

use heapless::Vec;

use crate::config::{PointTable, MAX_OUTPUTS};
use crate::traits::{ActuationGateway, Authority, LogSink, OutputId, OutputState, Severity};

/// Outcome of one safing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SafingReport {
    /// Commands accepted by the gateway
    pub commanded: u8,
    /// Commands the gateway rejected
    pub failed: u8,
}

impl SafingReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Ordered safe-state commands
#[derive(Debug, Clone, Default)]
pub struct SafingRoutine {
    steps: Vec<(OutputId, OutputState), MAX_OUTPUTS>,
}

impl SafingRoutine {
    /// Outputs with a safing rank, lowest rank first
    ///
    /// Equal ranks keep table order.
    pub fn from_points(points: &PointTable) -> Self {
        let mut ranked: Vec<(u8, u8, OutputState), MAX_OUTPUTS> = Vec::new();
        for (i, output) in points.outputs.iter().enumerate() {
            if let Some(rank) = output.safing_rank {
                let _ = ranked.push((rank, i as u8, output.safe_state));
            }
        }
        ranked.sort_unstable_by_key(|(rank, index, _)| (*rank, *index));

        let steps = ranked
            .iter()
            .map(|(_, index, state)| (OutputId(*index), *state))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[(OutputId, OutputState)] {
        &self.steps
    }

    /// Command every tracked output to its safe state
    pub fn execute<G, L>(&self, gateway: &mut G, authority: Authority, log: &mut L) -> SafingReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        let mut report = SafingReport::default();
        for (id, state) in self.steps.iter() {
            match gateway.set_output(*id, *state, authority) {
                Ok(()) => report.commanded += 1,
                Err(e) => {
                    report.failed += 1;
                    log.record(
                        Severity::Fault,
                        format_args!("safing output #{} failed: {}", id.0, e),
                    );
                }
            }
        }
        report
    }
}
