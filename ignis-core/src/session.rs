//! Sequence session
//!
//! Owns every piece of mutable sequencing state for one test attempt: the
//! clock, the trigger table, both holds, the interlock monitor and the
//! record ranges. Two entry points drive it:
//!
//! - [`SequenceSession::monitor`] runs the interlock side. It may only safe
//!   the outputs, stop the clock and disarm.
//! - [`SequenceSession::tick`] runs the scheduler side. It owns fired flags
//!   and hold clearances.
//!
//! Callers serialize the two through one lock. [`SequenceSession::process`]
//! runs both in the required order (interlocks first) for single-threaded
//! hosts.

use heapless::Vec;

use crate::clock::{format_t_time, ClockError, CountdownClock};
use crate::config::{AuthorityConfig, ConfigFault, Label, SequenceConfig, SupplyConfig};
use crate::hold::{
    ClearReason, HoldDirective, HoldError, HoldReason, MainHold, Permissives, ValidationHold,
    ValidationOutcome,
};
use crate::record::{RecordTimes, SessionRecord};
use crate::safety::{InterlockMonitor, ResetError, SafingRoutine, TripCause};
use crate::scheduler::{AutosequenceScheduler, TickInputs, TickReport};
use crate::state::{Event, SessionState};
use crate::traits::{ActuationGateway, LogSink, Severity, TelemetrySnapshot};

/// Records one report can carry: an abort range plus the closing pair
pub const MAX_REPORT_RECORDS: usize = 3;

/// Snapshot of one tick for status publication
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionReport {
    /// T-time after the tick
    pub t_ms: i64,
    /// State after the tick
    pub state: SessionState,
    /// Clock advancing after the tick
    pub clock_running: bool,
    /// Scheduler activity
    pub scheduler: TickReport,
    /// Emitted on completion, shutdown and abort, empty otherwise
    pub records: Vec<SessionRecord, MAX_REPORT_RECORDS>,
}

/// One test attempt
#[derive(Debug, Clone)]
pub struct SequenceSession {
    name: Label,
    state: SessionState,
    clock: CountdownClock,
    scheduler: AutosequenceScheduler,
    main_hold: MainHold,
    validation: Option<ValidationHold>,
    monitor: InterlockMonitor,
    safing: SafingRoutine,
    supply: Option<SupplyConfig>,
    supply_override: bool,
    supply_fault_logged: bool,
    authority: AuthorityConfig,
    armed: bool,
    sequence_started: bool,
    shutdown_requested: bool,
    last_hold: Option<HoldReason>,
    times: RecordTimes,
    pad_ms: i64,
    /// Abort range not yet handed out
    pending_abort: Option<SessionRecord>,
}

impl SequenceSession {
    /// Build a session from validated configuration
    pub fn new(config: &SequenceConfig, now_ms: i64) -> Result<Self, ConfigFault> {
        config.validate()?;

        Ok(Self {
            name: config.name.clone(),
            state: SessionState::Idle,
            clock: CountdownClock::new(config.start_ms),
            scheduler: AutosequenceScheduler::new(&config.events, config.authority.sequence)?,
            main_hold: MainHold::new(config.main_hold),
            validation: config.validation.as_ref().map(ValidationHold::new),
            monitor: InterlockMonitor::new(&config.interlocks)?,
            safing: SafingRoutine::from_points(&config.points),
            supply: config.supply,
            supply_override: false,
            supply_fault_logged: false,
            authority: config.authority,
            armed: false,
            sequence_started: false,
            shutdown_requested: false,
            last_hold: None,
            times: RecordTimes::new(now_ms),
            pad_ms: config.record_pad_ms,
            pending_abort: None,
        })
    }

    // ---- accessors ----

    /// Session name, the prefix of every record
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current T-time
    pub fn t_time(&self, now_ms: i64) -> i64 {
        self.clock.tick(now_ms)
    }

    /// The countdown clock (read-only)
    pub fn clock(&self) -> &CountdownClock {
        &self.clock
    }

    /// The trigger table and its fired flags
    pub fn scheduler(&self) -> &AutosequenceScheduler {
        &self.scheduler
    }

    pub fn main_hold(&self) -> &MainHold {
        &self.main_hold
    }

    /// The validation hold, if configured
    pub fn validation(&self) -> Option<&ValidationHold> {
        self.validation.as_ref()
    }

    /// Interlock conditions and trip latch
    pub fn interlocks(&self) -> &InterlockMonitor {
        &self.monitor
    }

    /// Autosequence armed by the operator
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Abort monitor armed
    pub fn is_abort_armed(&self) -> bool {
        self.monitor.is_armed()
    }

    /// Full-dataset range open
    pub fn is_recording(&self) -> bool {
        self.times.is_recording()
    }

    /// Terminal: the session ignores every further tick
    pub fn is_shutdown(&self) -> bool {
        self.state == SessionState::Shutdown
    }

    /// Hand out the range recorded by the last trip
    ///
    /// A range not taken here is carried by the next tick's report.
    pub fn take_abort_record(&mut self) -> Option<SessionRecord> {
        self.pending_abort.take()
    }

    // ---- operator controls ----

    /// Arm or disarm the autosequence
    pub fn set_armed<L: LogSink + ?Sized>(&mut self, armed: bool, log: &mut L) {
        if self.armed == armed {
            return;
        }
        self.armed = armed;
        if armed {
            log.record(Severity::Info, format_args!("Autosequence armed"));
        } else {
            log.record(Severity::Info, format_args!("Autosequence disarmed"));
        }
    }

    /// Arm or disarm the abort monitor
    ///
    /// Arming is refused while any interlock threshold is unset.
    pub fn set_abort_armed<L: LogSink + ?Sized>(
        &mut self,
        armed: bool,
        log: &mut L,
    ) -> Result<(), ConfigFault> {
        if armed == self.monitor.is_armed() {
            return Ok(());
        }
        if armed {
            if let Err(fault) = self.monitor.arm() {
                log.record(
                    Severity::Warn,
                    format_args!("Abort arm refused: {}", fault),
                );
                return Err(fault);
            }
            log.record(Severity::Info, format_args!("Abort armed"));
        } else {
            self.monitor.disarm();
            log.record(Severity::Info, format_args!("Abort disarmed"));
        }
        Ok(())
    }

    /// Give or withdraw main hold clearance
    ///
    /// Clearance is only accepted inside the sequence window. Giving it
    /// also re-arms a stalled validation hold.
    pub fn set_main_hold_cleared<L: LogSink + ?Sized>(
        &mut self,
        cleared: bool,
        now_ms: i64,
        log: &mut L,
    ) {
        let t = self.clock.tick(now_ms);
        if !cleared {
            if self.main_hold.revoke() {
                log.record(
                    Severity::Info,
                    format_args!("Main hold clearance withdrawn at {}", format_t_time(t)),
                );
            }
            return;
        }

        if !self.main_hold.in_window(t) {
            log.record(
                Severity::Warn,
                format_args!(
                    "Main hold clearance ignored at {}: outside sequence window",
                    format_t_time(t)
                ),
            );
            return;
        }
        if self.main_hold.clear() {
            log.record(
                Severity::Info,
                format_args!("Main hold cleared at {}", format_t_time(t)),
            );
        }
        if let Some(validation) = self.validation.as_mut() {
            if validation.retry() {
                log.record(
                    Severity::Info,
                    format_args!("{} hold re-armed", validation.label()),
                );
            }
        }
    }

    /// Operator override of the validation hold
    pub fn override_validation<L: LogSink + ?Sized>(&mut self, log: &mut L) -> Result<(), HoldError> {
        let validation = self.validation.as_mut().ok_or(HoldError::NoValidation)?;
        validation.request_override()?;
        log.record(
            Severity::Warn,
            format_args!("{} override engaged", validation.label()),
        );
        Ok(())
    }

    /// Manual abort; takes effect on the next monitor pass
    pub fn request_abort<L: LogSink + ?Sized>(&mut self, log: &mut L) -> bool {
        let accepted = self.monitor.request_abort();
        if !accepted {
            log.record(
                Severity::Warn,
                format_args!("Abort request ignored: abort not armed"),
            );
        }
        accepted
    }

    /// Orderly shutdown at the top of the next tick
    pub fn request_shutdown<L: LogSink + ?Sized>(&mut self, log: &mut L) {
        if !self.shutdown_requested {
            self.shutdown_requested = true;
            log.record(Severity::Info, format_args!("Shutdown requested"));
        }
    }

    /// Bypass the supply permissive
    pub fn set_supply_override<L: LogSink + ?Sized>(&mut self, on: bool, log: &mut L) {
        if self.supply_override == on {
            return;
        }
        self.supply_override = on;
        if on {
            log.record(Severity::Warn, format_args!("COPV override engaged"));
        } else {
            log.record(Severity::Info, format_args!("COPV override released"));
        }
    }

    /// Start or stop the full-dataset range
    pub fn set_recording<L: LogSink + ?Sized>(&mut self, on: bool, now_ms: i64, log: &mut L) {
        if on {
            if self.times.start_recording(now_ms) {
                log.record(Severity::Info, format_args!("Starting data recording"));
            }
        } else if self.times.stop_recording(now_ms) {
            log.record(Severity::Info, format_args!("Stopping data recording"));
        }
    }

    /// Manual clock start/stop
    ///
    /// Refused inside the sequence window, where the holds own the clock.
    pub fn set_clock_running<L: LogSink + ?Sized>(
        &mut self,
        run: bool,
        now_ms: i64,
        log: &mut L,
    ) -> bool {
        if self.state.in_sequence() {
            log.record(
                Severity::Warn,
                format_args!("Clock is under sequence control; use the hold controls"),
            );
            return false;
        }
        if self.clock.set_running(run, now_ms) {
            let t = format_t_time(self.clock.tick(now_ms));
            if run {
                log.record(Severity::Info, format_args!("T-clock started at {}", t));
            } else {
                log.record(Severity::Info, format_args!("T-clock stopped at {}", t));
            }
        }
        true
    }

    /// Shift T-time; rewinding re-arms events on the next tick
    pub fn adjust_clock<L: LogSink + ?Sized>(
        &mut self,
        delta_ms: f64,
        now_ms: i64,
        log: &mut L,
    ) -> Result<(), ClockError> {
        if let Err(e) = self.clock.adjust(delta_ms) {
            log.record(Severity::Warn, format_args!("Clock adjust rejected: {}", e));
            return Err(e);
        }
        log.record(
            Severity::Info,
            format_args!("T-time adjusted to {}", format_t_time(self.clock.tick(now_ms))),
        );
        Ok(())
    }

    /// Move to an absolute T-time
    pub fn set_t_time<L: LogSink + ?Sized>(
        &mut self,
        target_ms: i64,
        now_ms: i64,
        log: &mut L,
    ) -> Result<(), ClockError> {
        self.clock.set(target_ms, now_ms)?;
        log.record(
            Severity::Info,
            format_args!("T-time set to {}", format_t_time(target_ms)),
        );
        Ok(())
    }

    /// Refresh setpoints, margins and thresholds
    ///
    /// The trigger table and point tables are not reloadable.
    pub fn reload_setpoints<L: LogSink + ?Sized>(&mut self, config: &SequenceConfig, log: &mut L) {
        if let (Some(validation), Some(fresh)) = (self.validation.as_mut(), &config.validation) {
            validation.reload(fresh);
        }
        self.monitor.reload(&config.interlocks);
        self.supply = config.supply;
        self.supply_fault_logged = false;
        log.record(Severity::Info, format_args!("Setpoints reloaded"));
    }

    /// Clear a latched trip
    pub fn reset_interlocks<L: LogSink + ?Sized>(&mut self, log: &mut L) -> Result<(), ResetError> {
        if let Err(e) = self.monitor.reset() {
            log.record(Severity::Warn, format_args!("Redline reset refused: {}", e));
            return Err(e);
        }
        self.apply(Event::InterlockReset);
        log.record(Severity::Info, format_args!("Redlines reset"));
        Ok(())
    }

    // ---- interlock side ----

    /// Evaluate interlocks; safe everything on a new trip
    ///
    /// Idempotent: a latched trip does not re-run safing.
    pub fn monitor<G, L>(
        &mut self,
        now_ms: i64,
        snapshot: &TelemetrySnapshot,
        gateway: &mut G,
        log: &mut L,
    ) -> Option<TripCause>
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        if self.state == SessionState::Shutdown {
            return None;
        }
        let cause = self.monitor.evaluate(snapshot)?;
        self.trip(cause, now_ms, gateway, log);
        Some(cause)
    }

    fn trip<G, L>(&mut self, cause: TripCause, now_ms: i64, gateway: &mut G, log: &mut L)
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        let t = format_t_time(self.clock.tick(now_ms));
        match cause {
            TripCause::Redline { interlock } => {
                let condition = self.monitor.conditions().get(interlock as usize);
                let label = condition.map(|c| c.label.as_str()).unwrap_or("?");
                let value = condition.and_then(|c| c.current).unwrap_or(f32::NAN);
                log.record(
                    Severity::Fault,
                    format_args!("Redline {} tripped at {} (reading {})", label, t, value),
                );
            }
            TripCause::Manual => {
                log.record(Severity::Fault, format_args!("Manual abort at {}", t));
            }
        }
        if let Some(fault) = self.monitor.last_fault() {
            log.record(Severity::Fault, format_args!("Interlock config fault: {}", fault));
        }

        let report = self.safing.execute(gateway, self.authority.abort, log);
        self.clock.set_running(false, now_ms);
        self.armed = false;
        self.apply(Event::InterlockTripped(cause));
        self.pending_abort = Some(self.times.abort_record(&self.name, now_ms, self.pad_ms));

        log.record(
            Severity::Fault,
            format_args!(
                "Safing complete: {} outputs commanded, {} failed",
                report.commanded, report.failed
            ),
        );
    }

    // ---- scheduler side ----

    /// Interlocks, then the scheduler
    pub fn process<G, L>(
        &mut self,
        now_ms: i64,
        snapshot: &TelemetrySnapshot,
        gateway: &mut G,
        log: &mut L,
    ) -> SessionReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        self.monitor(now_ms, snapshot, gateway, log);
        self.tick(now_ms, snapshot, gateway, log)
    }

    /// Advance the sequence one tick
    pub fn tick<G, L>(
        &mut self,
        now_ms: i64,
        snapshot: &TelemetrySnapshot,
        gateway: &mut G,
        log: &mut L,
    ) -> SessionReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        let mut scheduler = TickReport::default();
        let mut records = Vec::new();
        if let Some(abort) = self.pending_abort.take() {
            let _ = records.push(abort);
        }

        if self.state == SessionState::Shutdown {
            return self.report(now_ms, scheduler, records);
        }
        if self.shutdown_requested {
            let closing = self.shutdown(now_ms, gateway, log);
            append_records(&mut records, closing);
            return self.report(now_ms, scheduler, records);
        }

        let t = self.clock.tick(now_ms);

        if self.state.is_aborted() {
            // A trip invalidates the operator's clearance
            self.main_hold.revoke();
            scheduler = self.rearm_pass(t, snapshot, gateway, log);
            return self.report(now_ms, scheduler, records);
        }

        if self.state == SessionState::Complete {
            if t < self.main_hold.boundary_ms() {
                self.leave_window(t, log);
            }
            scheduler = self.rearm_pass(t, snapshot, gateway, log);
            return self.report(now_ms, scheduler, records);
        }

        let supply_ready = self.sequence_started || self.supply_ready(snapshot, log);
        let permissives = Permissives {
            armed: self.armed,
            abort_armed: self.monitor.is_armed(),
            supply_ready,
        };

        match self.main_hold.evaluate(t, permissives) {
            HoldDirective::Inactive => {
                self.leave_window(t, log);
                scheduler = self.rearm_pass(t, snapshot, gateway, log);
            }
            HoldDirective::Hold(reason) => {
                self.clock.set_running(false, now_ms);
                if self.last_hold != Some(reason) {
                    self.last_hold = Some(reason);
                    log.record(
                        Severity::Info,
                        format_args!("Holding at {}: {}", format_t_time(t), reason.as_str()),
                    );
                }
                self.apply(Event::HoldEngaged(reason));
                scheduler = self.rearm_pass(t, snapshot, gateway, log);
            }
            HoldDirective::Proceed => {
                scheduler = self.proceed(t, now_ms, snapshot, gateway, log);
                if !scheduler.fired.is_empty() && self.scheduler.is_complete() {
                    let closing = self.complete(now_ms, gateway, log);
                    append_records(&mut records, closing);
                }
            }
        }

        self.report(now_ms, scheduler, records)
    }

    fn proceed<G, L>(
        &mut self,
        t: i64,
        now_ms: i64,
        snapshot: &TelemetrySnapshot,
        gateway: &mut G,
        log: &mut L,
    ) -> TickReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        self.last_hold = None;
        if !self.sequence_started {
            self.sequence_started = true;
            self.times.mark_test_start(now_ms, self.pad_ms);
            log.record(
                Severity::Info,
                format_args!("Main hold cleared, starting sequence at {}", format_t_time(t)),
            );
        }

        let mut hold_cleared = true;
        let mut event = None;
        if let Some(validation) = self.validation.as_mut() {
            match validation.poll(t, now_ms, snapshot) {
                ValidationOutcome::NotDue => hold_cleared = false,
                ValidationOutcome::Started => {
                    hold_cleared = false;
                    self.clock.set_running(false, now_ms);
                    log.record(
                        Severity::Warn,
                        format_args!(
                            "{} out of band at {}, holding up to {} ms",
                            validation.label(),
                            format_t_time(t),
                            validation.timeout_ms()
                        ),
                    );
                    if let Some(fault) = validation.take_fault(snapshot) {
                        log.record(
                            Severity::Warn,
                            format_args!("{}: {}", validation.label(), fault),
                        );
                    }
                    event = Some(Event::ValidationStarted);
                }
                ValidationOutcome::Waiting | ValidationOutcome::StillStalled => {
                    hold_cleared = false;
                }
                ValidationOutcome::Cleared(reason) => {
                    let how = match reason {
                        ClearReason::InBand => "in band",
                        ClearReason::Settled => "in band after hold",
                        ClearReason::Override => "by override",
                    };
                    log.record(
                        Severity::Info,
                        format_args!("{} validation completed {}", validation.label(), how),
                    );
                    event = Some(Event::ValidationCleared);
                }
                ValidationOutcome::AlreadyCleared => {}
                ValidationOutcome::Stalled => {
                    hold_cleared = false;
                    log.record(
                        Severity::Warn,
                        format_args!(
                            "{} validation failed at {}: prepress hold stalled, re-clear main hold to retry",
                            validation.label(),
                            format_t_time(t)
                        ),
                    );
                    self.main_hold.revoke();
                    event = Some(Event::ValidationStalled);
                }
            }
        }
        if let Some(event) = event {
            self.apply(event);
        }

        let blocking = self.validation.as_ref().is_some_and(|v| v.is_blocking());
        if !blocking {
            if self.clock.set_running(true, now_ms) {
                log.record(
                    Severity::Info,
                    format_args!("T-clock running at {}", format_t_time(t)),
                );
            }
            self.apply(Event::HoldReleased);
        }

        let held_from_ms = if blocking {
            self.validation.as_ref().map(|v| v.trigger_ms())
        } else {
            None
        };
        let inputs = TickInputs {
            telemetry: snapshot,
            hold_cleared,
            firing_enabled: true,
            held_from_ms,
        };
        self.scheduler.tick(t, &inputs, gateway, log)
    }

    fn rearm_pass<G, L>(
        &mut self,
        t: i64,
        snapshot: &TelemetrySnapshot,
        gateway: &mut G,
        log: &mut L,
    ) -> TickReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        if let Some(validation) = self.validation.as_mut() {
            validation.rearm_if_rewound(t);
        }
        let inputs = TickInputs {
            telemetry: snapshot,
            hold_cleared: false,
            firing_enabled: false,
            held_from_ms: None,
        };
        self.scheduler.tick(t, &inputs, gateway, log)
    }

    fn leave_window<L: LogSink + ?Sized>(&mut self, t: i64, log: &mut L) {
        if self.state.in_sequence() {
            if t > self.main_hold.window_end_ms() {
                let unfired = self.scheduler.events().len() - self.scheduler.fired_count();
                log.record(
                    Severity::Warn,
                    format_args!(
                        "Sequence window closed at {} with {} events unfired",
                        format_t_time(t),
                        unfired
                    ),
                );
            } else {
                log.record(
                    Severity::Info,
                    format_args!("Left sequence window at {}", format_t_time(t)),
                );
            }
        }
        if t < self.main_hold.boundary_ms() {
            self.sequence_started = false;
        }
        self.main_hold.revoke();
        self.last_hold = None;
        self.apply(Event::WindowExited);
    }

    fn complete<G, L>(&mut self, now_ms: i64, gateway: &mut G, log: &mut L) -> Vec<SessionRecord, 2>
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        let t = format_t_time(self.clock.tick(now_ms));
        self.times.mark_test_end(now_ms, self.pad_ms);
        log.record(Severity::Info, format_args!("Sequence complete at {}", t));

        let report = self.safing.execute(gateway, self.authority.sequence, log);
        if !report.is_clean() {
            log.record(
                Severity::Fault,
                format_args!("Post-sequence safing: {} outputs failed", report.failed),
            );
        }
        self.armed = false;
        self.main_hold.revoke();
        self.apply(Event::SequenceComplete);
        self.times.records(&self.name, now_ms)
    }

    fn shutdown<G, L>(&mut self, now_ms: i64, gateway: &mut G, log: &mut L) -> Vec<SessionRecord, 2>
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        log.record(
            Severity::Info,
            format_args!(
                "Shutting down autosequence at {}",
                format_t_time(self.clock.tick(now_ms))
            ),
        );
        let report = self.safing.execute(gateway, self.authority.abort, log);
        if !report.is_clean() {
            log.record(
                Severity::Fault,
                format_args!("Shutdown safing: {} outputs failed", report.failed),
            );
        }
        self.clock.set_running(false, now_ms);
        self.armed = false;
        self.monitor.disarm();
        self.main_hold.revoke();
        self.set_recording(false, now_ms, log);
        self.apply(Event::ShutdownRequested);
        self.times.records(&self.name, now_ms)
    }

    fn supply_ready<L: LogSink + ?Sized>(&mut self, snapshot: &TelemetrySnapshot, log: &mut L) -> bool {
        if self.supply_override {
            return true;
        }
        let Some(supply) = self.supply else {
            return true;
        };
        match supply.minimum.resolve(supply.input) {
            Ok(None) => true,
            Ok(Some(minimum)) => snapshot.get(supply.input).is_some_and(|v| v >= minimum),
            Err(fault) => {
                if !self.supply_fault_logged {
                    self.supply_fault_logged = true;
                    log.record(Severity::Warn, format_args!("Supply permissive: {}", fault));
                }
                false
            }
        }
    }

    fn apply(&mut self, event: Event) {
        self.state = self.state.transition(event);
    }

    fn report(
        &self,
        now_ms: i64,
        scheduler: TickReport,
        records: Vec<SessionRecord, MAX_REPORT_RECORDS>,
    ) -> SessionReport {
        SessionReport {
            t_ms: self.clock.tick(now_ms),
            state: self.state,
            clock_running: self.clock.is_running(),
            scheduler,
            records,
        }
    }
}

fn append_records(
    into: &mut Vec<SessionRecord, MAX_REPORT_RECORDS>,
    from: Vec<SessionRecord, 2>,
) {
    for record in from {
        let _ = into.push(record);
    }
}
