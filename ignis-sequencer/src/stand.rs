//! Test stand connection
//!
//! The sequencer drives either the in-memory simulator or a framed command
//! link over TCP. Both defer pulse releases to the release task.

use std::io::{self, Read, Write as _};
use std::net::TcpStream;
use std::thread;

use embassy_futures::block_on;
use ignis_core::config::PointTable;
use ignis_core::traits::{
    ActuationGateway, Authority, GatewayError, InputId, OutputId, OutputState,
};
use ignis_core::SessionReport;
use ignis_drivers::{DeferredRelease, FramedGateway, PendingRelease, SimGateway};
use ignis_protocol::{FeedMessage, FrameParser};
use tracing::{debug, error, info, trace, warn};

use crate::channels::{FeedEvent, FeedUpdate, FEED_CHANNEL};
use crate::error::StartupError;

/// Buffer size for socket reads
const RX_BUF_SIZE: usize = 256;

/// Command half of the TCP link
pub struct TcpLink(TcpStream);

impl embedded_io::ErrorType for TcpLink {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for TcpLink {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.write(buf).map_err(|_| embedded_io::ErrorKind::BrokenPipe)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.flush().map_err(|_| embedded_io::ErrorKind::BrokenPipe)
    }
}

pub enum Stand {
    Sim(SimGateway),
    Link(FramedGateway<TcpLink>),
}

impl Stand {
    pub fn simulated(points: PointTable) -> Self {
        info!("Driving the simulated stand");
        Stand::Sim(SimGateway::new(points))
    }

    /// Connect to the stand and start the telemetry reader thread
    ///
    /// The reader is detached; losing the link reaches the controller as
    /// [`FeedEvent::LinkLost`].
    pub fn connect(addr: &str, points: PointTable) -> Result<Self, StartupError> {
        let connect_err = |source| StartupError::Connect {
            addr: addr.to_string(),
            source,
        };
        let stream = TcpStream::connect(addr).map_err(connect_err)?;
        stream.set_nodelay(true).map_err(connect_err)?;
        let rx = stream.try_clone().map_err(connect_err)?;
        thread::Builder::new()
            .name("telemetry-rx".into())
            .spawn(move || telemetry_reader(rx))
            .map_err(|e| StartupError::Thread("telemetry", e))?;
        info!("Connected to stand at {}", addr);
        Ok(Stand::Link(FramedGateway::new(TcpLink(stream), points)))
    }

    pub fn points(&self) -> &PointTable {
        match self {
            Stand::Sim(sim) => sim.points(),
            Stand::Link(link) => link.points(),
        }
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self, Stand::Sim(_))
    }

    /// Cache a scaled telemetry value for `read_input`
    pub fn ingest(&mut self, id: InputId, value: f32) {
        match self {
            Stand::Sim(sim) => sim.set_input(id, value),
            Stand::Link(link) => link.ingest(id, value),
        }
    }

    /// Send clock, status and queued log lines to the consoles
    pub fn publish<I>(&mut self, report: &SessionReport, lines: I) -> Result<(), GatewayError>
    where
        I: IntoIterator<Item = String>,
    {
        match self {
            Stand::Sim(_) => {
                trace!(t_ms = report.t_ms, state = report.state.name(), "Tick");
                Ok(())
            }
            Stand::Link(link) => {
                link.publish_clock(report.t_ms, report.clock_running)?;
                link.publish_status(report.state.code())?;
                for line in lines {
                    link.publish_log(&line)?;
                }
                Ok(())
            }
        }
    }
}

impl ActuationGateway for Stand {
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        match self {
            Stand::Sim(sim) => sim.set_output(id, state, authority),
            Stand::Link(link) => link.set_output(id, state, authority),
        }
    }

    fn pulse(
        &mut self,
        id: OutputId,
        duration_ms: u32,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        match self {
            Stand::Sim(sim) => sim.pulse(id, duration_ms, authority),
            Stand::Link(link) => link.pulse(id, duration_ms, authority),
        }
    }

    fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError> {
        match self {
            Stand::Sim(sim) => sim.read_input(id),
            Stand::Link(link) => link.read_input(id),
        }
    }

    fn output_state(&self, id: OutputId) -> Option<OutputState> {
        match self {
            Stand::Sim(sim) => sim.output_state(id),
            Stand::Link(link) => link.output_state(id),
        }
    }
}

impl DeferredRelease for Stand {
    fn take_release(&mut self) -> Option<PendingRelease> {
        match self {
            Stand::Sim(sim) => sim.take_release(),
            Stand::Link(link) => link.take_release(),
        }
    }

    fn release(&mut self, pending: PendingRelease) -> Result<(), GatewayError> {
        match self {
            Stand::Sim(sim) => sim.release(pending),
            Stand::Link(link) => link.release(pending),
        }
    }
}

/// Feed reader thread body: frames from the stand into `FEED_CHANNEL`
///
/// Ends with a `LinkLost` event when the socket closes or fails.
fn telemetry_reader(mut rx: TcpStream) {
    let mut parser = FrameParser::new();
    let mut buf = [0u8; RX_BUF_SIZE];

    loop {
        let n = match rx.read(&mut buf) {
            Ok(0) => {
                error!("Telemetry link closed by the stand");
                break;
            }
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Telemetry read failed: {}", e);
                break;
            }
        };

        parser.feed_all(&buf[..n], |frame| match FeedMessage::from_frame(&frame) {
            Ok(FeedMessage::Value { name, value }) => match FeedUpdate::new(name, value) {
                Some(update) => block_on(FEED_CHANNEL.send(FeedEvent::Update(update))),
                None => warn!("Dropping update with oversized name"),
            },
            Ok(FeedMessage::Heartbeat) => trace!("Heartbeat"),
            Err(e) => debug!("Ignoring frame: {}", e),
        });
    }

    block_on(FEED_CHANNEL.send(FeedEvent::LinkLost));
}
