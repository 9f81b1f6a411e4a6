//! Sequencer controller
//!
//! The single owner of sequencing state. The tasks share one controller
//! behind a mutex; every method here runs with that lock held and never
//! sleeps.
//!
//! - Feed updates are either operator controls or telemetry
//! - `monitor` is the interlock side, `tick` the scheduler side; every
//!   tick runs an interlock pass first
//! - A lost stand link withdraws main hold clearance until restart
//! - Pulse releases are scheduled here and executed by the release task

use std::path::PathBuf;

use heapless::Vec as HVec;
use ignis_core::config::SequenceConfig;
use ignis_core::record::SessionRecord;
use ignis_core::safety::TripCause;
use ignis_core::state::SessionState;
use ignis_core::traits::{InputId, LogSink, Severity, TelemetrySnapshot};
use ignis_core::{SequenceSession, SessionReport};
use ignis_drivers::gateway::MAX_PENDING;
use ignis_drivers::{DeferredRelease, PendingRelease, PressureTransducer};
use ignis_protocol::{Control, ControlChannel};
use tracing::{debug, error, info, warn};

use crate::archive::{SessionArchive, WallClock};
use crate::config::ConfigSource;
use crate::error::ConfigError;
use crate::log::SessionLog;
use crate::stand::Stand;

/// What a feed update turned out to be
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    Control(Control),
    Telemetry(InputId),
    /// Unknown name, momentary control released, or unusable value
    Ignored,
}

/// Pulse release with its due time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledRelease {
    due_ms: i64,
    pending: PendingRelease,
}

pub struct Controller {
    session: SequenceSession,
    stand: Stand,
    /// Indexed by input id
    transducers: Vec<PressureTransducer>,
    snapshot: TelemetrySnapshot,
    log: SessionLog,
    source: ConfigSource,
    releases: HVec<ScheduledRelease, MAX_PENDING>,
    archive: Option<(PathBuf, WallClock)>,
    /// Everything written so far, by record name
    archived: Vec<SessionRecord>,
    last_state: SessionState,
    link_fault_logged: bool,
    link_lost: bool,
}

impl Controller {
    pub fn new(
        config: &SequenceConfig,
        source: ConfigSource,
        stand: Stand,
        log: SessionLog,
        now_ms: i64,
    ) -> Result<Self, ConfigError> {
        let session = SequenceSession::new(config, now_ms)?;
        let transducers = config
            .points
            .inputs
            .iter()
            .map(PressureTransducer::from_config)
            .collect();

        info!(
            "Session {} ready at T{:+} ms",
            session.name(),
            session.t_time(now_ms)
        );

        Ok(Self {
            last_state: session.state(),
            session,
            stand,
            transducers,
            snapshot: TelemetrySnapshot::new(),
            log,
            source,
            releases: HVec::new(),
            archive: None,
            archived: Vec::new(),
            link_fault_logged: false,
            link_lost: false,
        })
    }

    /// Write session records under `dir` on completion and shutdown
    pub fn with_archive(mut self, dir: PathBuf, wall: WallClock) -> Self {
        self.archive = Some((dir, wall));
        self
    }

    pub fn session(&self) -> &SequenceSession {
        &self.session
    }

    pub fn stand(&self) -> &Stand {
        &self.stand
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn is_shutdown(&self) -> bool {
        self.session.is_shutdown()
    }

    pub fn is_link_lost(&self) -> bool {
        self.link_lost
    }

    /// The stand link is gone; values in the snapshot are stale
    ///
    /// Withdraws main hold clearance so nothing fires on stale telemetry.
    /// Clearance is refused from then on.
    pub fn link_lost(&mut self, now_ms: i64) {
        if self.link_lost {
            return;
        }
        self.link_lost = true;
        error!("Telemetry link lost, holding the countdown");
        self.log.record(
            Severity::Fault,
            format_args!(
                "Telemetry link lost at T{:+} ms",
                self.session.t_time(now_ms)
            ),
        );
        self.session
            .set_main_hold_cleared(false, now_ms, &mut self.log);
        self.note_state();
        self.publish(now_ms);
    }

    /// Route one named value update
    pub fn deliver(&mut self, name: &str, value: f32, now_ms: i64) -> Delivery {
        if let Some(channel) = ControlChannel::from_name(name) {
            return match channel.decode(value) {
                Some(control) => {
                    self.apply(control, now_ms);
                    Delivery::Control(control)
                }
                None => Delivery::Ignored,
            };
        }

        let Some(id) = self.stand.points().find_input(name) else {
            debug!("Ignoring update on unconfigured channel {}", name);
            return Delivery::Ignored;
        };
        match self.transducers[id.0 as usize].convert(value) {
            Ok(scaled) => {
                self.snapshot.update(id, scaled);
                self.stand.ingest(id, scaled);
                Delivery::Telemetry(id)
            }
            Err(e) => {
                warn!("{}: {}", name, e);
                Delivery::Ignored
            }
        }
    }

    /// Apply an operator control
    pub fn apply(&mut self, control: Control, now_ms: i64) {
        let log = &mut self.log;
        match control {
            Control::ArmAuto(on) => self.session.set_armed(on, log),
            Control::ArmAbort(on) => {
                // Refusal is logged by the session
                let _ = self.session.set_abort_armed(on, log);
            }
            Control::ClearMainHold(true) if self.link_lost => log.record(
                Severity::Warn,
                format_args!("Main hold clearance refused: telemetry link lost"),
            ),
            Control::ClearMainHold(on) => self.session.set_main_hold_cleared(on, now_ms, log),
            Control::OverrideValidation => {
                if let Err(e) = self.session.override_validation(log) {
                    log.record(Severity::Warn, format_args!("Override refused: {}", e));
                }
            }
            Control::Abort => {
                self.session.request_abort(log);
            }
            Control::Shutdown => self.session.request_shutdown(log),
            Control::ReloadSetpoints => match self.source.load() {
                Ok(config) => self.session.reload_setpoints(&config, log),
                Err(e) => log.record(
                    Severity::Warn,
                    format_args!("Setpoint reload failed, keeping current values: {}", e),
                ),
            },
            Control::RecordData(on) => self.session.set_recording(on, now_ms, log),
            Control::SupplyOverride(on) => self.session.set_supply_override(on, log),
            Control::ClockEnable(on) => {
                self.session.set_clock_running(on, now_ms, log);
            }
            Control::ClockAddSec(seconds) => {
                let _ = self
                    .session
                    .adjust_clock(f64::from(seconds) * 1_000.0, now_ms, log);
            }
            Control::ResetInterlocks => {
                let _ = self.session.reset_interlocks(log);
            }
        }
    }

    /// Interlock pass; a trip archives its abort range at once
    pub fn monitor(&mut self, now_ms: i64) -> Option<TripCause> {
        let cause = self
            .session
            .monitor(now_ms, &self.snapshot, &mut self.stand, &mut self.log);
        if cause.is_some() {
            if let Some(record) = self.session.take_abort_record() {
                self.write_archive(&[record]);
            }
            self.note_state();
            self.publish(now_ms);
        }
        cause
    }

    /// Interlock pass, then scheduler pass; publishes status and archives
    /// emitted records
    pub fn tick(&mut self, now_ms: i64) -> SessionReport {
        // A redline in the latest delivery latches before anything fires
        if let Some(cause) = self.monitor(now_ms) {
            error!("Interlock tripped: {:?}", cause);
        }
        let report = self
            .session
            .tick(now_ms, &self.snapshot, &mut self.stand, &mut self.log);
        self.note_state();
        if !report.records.is_empty() {
            self.write_archive(&report.records);
        }
        self.publish_report(&report);
        report
    }

    fn note_state(&mut self) {
        let state = self.session.state();
        if state != self.last_state {
            info!("Session state {} -> {}", self.last_state.name(), state.name());
            self.last_state = state;
        }
    }

    fn publish(&mut self, now_ms: i64) {
        let report = SessionReport {
            t_ms: self.session.t_time(now_ms),
            state: self.session.state(),
            clock_running: self.session.clock().is_running(),
            scheduler: Default::default(),
            records: HVec::new(),
        };
        self.publish_report(&report);
    }

    fn publish_report(&mut self, report: &SessionReport) {
        match self.stand.publish(report, self.log.drain_outbox()) {
            Ok(()) => self.link_fault_logged = false,
            Err(e) if !self.link_fault_logged => {
                warn!("Status publication failed: {}", e);
                self.link_fault_logged = true;
            }
            Err(_) => {}
        }
    }

    fn write_archive(&mut self, records: &[SessionRecord]) {
        let Some((dir, wall)) = &self.archive else {
            return;
        };
        for record in records {
            match self.archived.iter_mut().find(|r| r.name == record.name) {
                Some(slot) => *slot = record.clone(),
                None => self.archived.push(record.clone()),
            }
        }
        let archive = SessionArchive::new(self.session.name(), &self.archived, wall);
        match archive.write(dir) {
            Ok(path) => self.log.record(
                Severity::Info,
                format_args!("Session records written to {}", path.display()),
            ),
            Err(e) => self.log.record(
                Severity::Warn,
                format_args!("Session records not written: {}", e),
            ),
        }
    }

    // ---- pulse releases ----

    /// Move newly energized pulses onto the release schedule
    ///
    /// Returns true if anything was scheduled.
    pub fn collect_releases(&mut self, now_ms: i64) -> bool {
        let mut scheduled = false;
        while let Some(pending) = self.stand.take_release() {
            let entry = ScheduledRelease {
                due_ms: now_ms + i64::from(pending.duration_ms),
                pending,
            };
            if let Err(entry) = self.releases.push(entry) {
                warn!("Release schedule full, releasing output #{} now", pending.output.0);
                self.release(entry.pending);
                continue;
            }
            scheduled = true;
        }
        scheduled
    }

    /// Release every due pulse; returns the next due time
    pub fn release_due(&mut self, now_ms: i64) -> Option<i64> {
        let mut i = 0;
        while i < self.releases.len() {
            if self.releases[i].due_ms <= now_ms {
                let entry = self.releases.swap_remove(i);
                self.release(entry.pending);
            } else {
                i += 1;
            }
        }
        self.releases.iter().map(|r| r.due_ms).min()
    }

    /// Release everything immediately (shutdown path)
    pub fn release_all(&mut self) {
        self.collect_releases(0);
        while let Some(entry) = self.releases.pop() {
            self.release(entry.pending);
        }
    }

    pub fn pending_releases(&self) -> usize {
        self.releases.len()
    }

    fn release(&mut self, pending: PendingRelease) {
        if let Err(e) = self.stand.release(pending) {
            self.log.record(
                Severity::Fault,
                format_args!("Pulse release of output #{} failed: {}", pending.output.0, e),
            );
        }
    }
}
