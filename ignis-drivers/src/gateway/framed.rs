//! Command-link gateway
//!
//! Encodes output writes as COMMAND frames on any `embedded_io::Write`
//! link (TCP socket, serial port) and caches telemetry delivered by the
//! host's feed receiver for `read_input`.

use embedded_io::Write;
use ignis_core::config::{PointTable, MAX_OUTPUTS};
use ignis_core::traits::{
    ActuationGateway, Authority, GatewayError, InputId, OutputId, OutputState, TelemetrySnapshot,
};
use ignis_protocol::{LinkMessage, MAX_FRAME_SIZE};

use super::{DeferredRelease, PendingRelease, ReleaseQueue};

fn write_message<W: Write>(link: &mut W, message: &LinkMessage<'_>) -> Result<(), GatewayError> {
    let frame = message.to_frame().map_err(|_| GatewayError::LinkDown)?;
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let len = frame
        .encode(&mut buffer)
        .map_err(|_| GatewayError::LinkDown)?;
    link.write_all(&buffer[..len])
        .and_then(|_| link.flush())
        .map_err(|_| GatewayError::LinkDown)
}

/// Gateway writing framed commands to a byte link
pub struct FramedGateway<W> {
    link: W,
    points: PointTable,
    commanded: [Option<OutputState>; MAX_OUTPUTS],
    inputs: TelemetrySnapshot,
    releases: ReleaseQueue,
}

impl<W: Write> FramedGateway<W> {
    pub fn new(link: W, points: PointTable) -> Self {
        Self {
            link,
            points,
            commanded: [None; MAX_OUTPUTS],
            inputs: TelemetrySnapshot::new(),
            releases: ReleaseQueue::new(),
        }
    }

    pub fn points(&self) -> &PointTable {
        &self.points
    }

    /// Record a (scaled) telemetry value for `read_input`
    pub fn ingest(&mut self, id: InputId, value: f32) {
        self.inputs.update(id, value);
    }

    /// Latest cached telemetry
    pub fn inputs(&self) -> &TelemetrySnapshot {
        &self.inputs
    }

    /// Pulses awaiting release
    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }

    /// Encode and write one message, flushing the link
    pub fn send(&mut self, message: &LinkMessage<'_>) -> Result<(), GatewayError> {
        write_message(&mut self.link, message)
    }

    pub fn publish_clock(&mut self, t_ms: i64, running: bool) -> Result<(), GatewayError> {
        self.send(&LinkMessage::Clock { t_ms, running })
    }

    pub fn publish_status(&mut self, code: u8) -> Result<(), GatewayError> {
        self.send(&LinkMessage::Status(code))
    }

    pub fn publish_log(&mut self, line: &str) -> Result<(), GatewayError> {
        self.send(&LinkMessage::Log(line))
    }

    /// Give back the link (used by tests to inspect written bytes)
    pub fn into_link(self) -> W {
        self.link
    }
}

impl<W: Write> ActuationGateway for FramedGateway<W> {
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        let output = self
            .points
            .output(id)
            .ok_or(GatewayError::UnknownOutput(id))?;
        let message = LinkMessage::Command {
            authority: authority.0,
            level: state.wire_level(output.inverted) != 0,
            name: output.name.as_str(),
        };
        write_message(&mut self.link, &message)?;

        self.commanded[id.0 as usize] = Some(state);
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
        let queued = self.releases.push(PendingRelease {
            output: id,
            duration_ms,
            authority,
        });
        if let Err(e) = queued {
            // No room to defer: never leave the output active
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
        self.commanded.get(id.0 as usize).copied().flatten()
    }
}

impl<W: Write> DeferredRelease for FramedGateway<W> {
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
    use crate::gateway::MAX_PENDING;
    use ignis_core::config::{make_label, InputConfig, OutputConfig};
    use ignis_protocol::{FrameParser, LinkMessage};

    /// Link that fails once `fail` is set
    struct TestLink {
        bytes: std::vec::Vec<u8>,
        fail: bool,
    }

    impl embedded_io::ErrorType for TestLink {
        type Error = embedded_io::ErrorKind;
    }

    impl Write for TestLink {
        fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
            if self.fail {
                return Err(embedded_io::ErrorKind::BrokenPipe);
            }
            self.bytes.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    fn points() -> PointTable {
        let mut p = PointTable::new();
        let _ = p.outputs.push(OutputConfig {
            name: make_label("PURGE_cmd"),
            safe_state: OutputState::Energized,
            inverted: true,
            safing_rank: Some(0),
        });
        let _ = p.outputs.push(OutputConfig {
            name: make_label("IGNITOR_cmd"),
            safe_state: OutputState::Deenergized,
            inverted: false,
            safing_rank: Some(1),
        });
        let _ = p.inputs.push(InputConfig {
            name: make_label("PT_OX"),
            scale: None,
        });
        p
    }

    fn gateway() -> FramedGateway<TestLink> {
        FramedGateway::new(
            TestLink {
                bytes: std::vec::Vec::new(),
                fail: false,
            },
            points(),
        )
    }

    /// (authority, level, name) of every COMMAND written
    fn commands(bytes: &[u8]) -> std::vec::Vec<(u8, bool, std::string::String)> {
        let mut parser = FrameParser::new();
        let mut out = std::vec::Vec::new();
        parser.feed_all(bytes, |frame| {
            if let Ok(LinkMessage::Command {
                authority,
                level,
                name,
            }) = LinkMessage::from_frame(&frame)
            {
                out.push((authority, level, name.into()));
            }
        });
        out
    }

    #[test]
    fn test_inverted_output_level() {
        let mut gw = gateway();
        gw.set_output(OutputId(0), OutputState::Energized, Authority::SEQUENCE)
            .unwrap();
        gw.set_output(OutputId(1), OutputState::Energized, Authority::SEQUENCE)
            .unwrap();
        let cmds = commands(&gw.into_link().bytes);
        assert_eq!(cmds[0], (201, false, "PURGE_cmd".into()));
        assert_eq!(cmds[1], (201, true, "IGNITOR_cmd".into()));
    }

    #[test]
    fn test_unknown_output() {
        let mut gw = gateway();
        assert_eq!(
            gw.set_output(OutputId(7), OutputState::Energized, Authority::IDLE),
            Err(GatewayError::UnknownOutput(OutputId(7)))
        );
    }

    #[test]
    fn test_link_failure_keeps_last_state() {
        let mut gw = gateway();
        gw.set_output(OutputId(1), OutputState::Deenergized, Authority::IDLE)
            .unwrap();
        gw.link.fail = true;
        assert_eq!(
            gw.set_output(OutputId(1), OutputState::Energized, Authority::SEQUENCE),
            Err(GatewayError::LinkDown)
        );
        assert_eq!(gw.output_state(OutputId(1)), Some(OutputState::Deenergized));
    }

    #[test]
    fn test_pulse_deferred_release() {
        let mut gw = gateway();
        gw.pulse(OutputId(1), 500, Authority::SEQUENCE).unwrap();
        assert_eq!(gw.output_state(OutputId(1)), Some(OutputState::Energized));
        assert_eq!(gw.pending_releases(), 1);

        let pending = gw.take_release().unwrap();
        assert_eq!(pending.duration_ms, 500);
        gw.release(pending).unwrap();
        assert_eq!(gw.output_state(OutputId(1)), Some(OutputState::Deenergized));
        assert!(gw.take_release().is_none());
    }

    #[test]
    fn test_pulse_queue_full_restores_safe() {
        let mut gw = gateway();
        for _ in 0..MAX_PENDING {
            gw.pulse(OutputId(1), 100, Authority::SEQUENCE).unwrap();
        }
        assert_eq!(
            gw.pulse(OutputId(1), 100, Authority::SEQUENCE),
            Err(GatewayError::Busy)
        );
        assert_eq!(gw.output_state(OutputId(1)), Some(OutputState::Deenergized));
    }

    #[test]
    fn test_read_input() {
        let mut gw = gateway();
        assert_eq!(gw.read_input(InputId(0)), Err(GatewayError::NoData(InputId(0))));
        gw.ingest(InputId(0), 3_100.0);
        assert_eq!(gw.read_input(InputId(0)), Ok(3_100.0));
        assert_eq!(
            gw.read_input(InputId(3)),
            Err(GatewayError::UnknownInput(InputId(3)))
        );
    }

    #[test]
    fn test_clock_status_frames() {
        let mut gw = gateway();
        gw.publish_clock(-9_000, false).unwrap();
        gw.publish_status(4).unwrap();
        let bytes = gw.into_link().bytes;

        let mut parser = FrameParser::new();
        let mut seen = std::vec::Vec::new();
        parser.feed_all(&bytes, |f| seen.push(f));
        assert_eq!(
            LinkMessage::from_frame(&seen[0]),
            Ok(LinkMessage::Clock {
                t_ms: -9_000,
                running: false
            })
        );
        assert_eq!(LinkMessage::from_frame(&seen[1]), Ok(LinkMessage::Status(4)));
    }
}
