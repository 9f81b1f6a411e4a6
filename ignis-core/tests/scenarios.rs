//! End-to-end countdown scenarios against an in-memory test stand

use heapless::Vec;

use ignis_core::config::{
    make_label, BandCheckConfig, EventConfig, InputConfig, InterlockConfig, Limit,
    MainHoldConfig, OutputConfig, SequenceConfig, Threshold, ValidationConfig,
};
use ignis_core::scheduler::{Action, AutosequenceScheduler, EventId, Guard, TickInputs};
use ignis_core::state::SessionState;
use ignis_core::traits::{
    ActuationGateway, Authority, GatewayError, InputId, MemoryLog, OutputId, OutputState,
    TelemetrySnapshot,
};
use ignis_core::SequenceSession;

const PURGE: OutputId = OutputId(0);
const DELUGE: OutputId = OutputId(1);
const IGNITE: OutputId = OutputId(2);
const FIRE: OutputId = OutputId(3);

const OX_TANK: InputId = InputId(0);

/// Test stand: remembers every write
struct Stand {
    states: [Option<OutputState>; 4],
    writes: std::vec::Vec<(OutputId, OutputState, Authority)>,
}

impl Stand {
    fn new() -> Self {
        Self {
            states: [None; 4],
            writes: std::vec::Vec::new(),
        }
    }

    /// Outputs energized by the sequence, in order
    fn sequence_energized(&self) -> std::vec::Vec<OutputId> {
        self.writes
            .iter()
            .filter(|(_, state, auth)| {
                *state == OutputState::Energized && *auth == Authority::SEQUENCE
            })
            .map(|(id, _, _)| *id)
            .collect()
    }

    fn energize_count(&self, id: OutputId) -> usize {
        self.sequence_energized().iter().filter(|o| **o == id).count()
    }
}

impl ActuationGateway for Stand {
    fn set_output(
        &mut self,
        id: OutputId,
        state: OutputState,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        let slot = self
            .states
            .get_mut(id.0 as usize)
            .ok_or(GatewayError::UnknownOutput(id))?;
        *slot = Some(state);
        self.writes.push((id, state, authority));
        Ok(())
    }

    fn pulse(
        &mut self,
        id: OutputId,
        _duration_ms: u32,
        authority: Authority,
    ) -> Result<(), GatewayError> {
        self.set_output(id, OutputState::Energized, authority)?;
        self.set_output(id, OutputState::Deenergized, authority)
    }

    fn read_input(&mut self, id: InputId) -> Result<f32, GatewayError> {
        Err(GatewayError::NoData(id))
    }

    fn output_state(&self, id: OutputId) -> Option<OutputState> {
        self.states.get(id.0 as usize).copied().flatten()
    }
}

fn energize(label: &str, offset_ms: i64, output: OutputId) -> EventConfig {
    EventConfig {
        label: make_label(label),
        offset_ms,
        action: Action::Set {
            output,
            state: OutputState::Energized,
        },
        guards: Vec::new(),
    }
}

/// Hot-fire table: PURGE@-24s, DELUGE@-8s, IGNITE@-3s, FIRE@0
fn hotfire() -> SequenceConfig {
    let mut c = SequenceConfig {
        name: make_label("hotfire"),
        start_ms: -25_000,
        main_hold: MainHoldConfig {
            boundary_ms: -25_000,
            window_end_ms: 2_000,
        },
        ..Default::default()
    };
    for (name, safe, rank) in [
        ("PURGE_cmd", OutputState::Energized, 0),
        ("DELUGE_cmd", OutputState::Deenergized, 3),
        ("IGNITOR_cmd", OutputState::Deenergized, 1),
        ("ACTUATOR_cmd", OutputState::Deenergized, 2),
    ] {
        let _ = c.points.outputs.push(OutputConfig {
            name: make_label(name),
            safe_state: safe,
            inverted: false,
            safing_rank: Some(rank),
        });
    }
    let _ = c.points.inputs.push(InputConfig {
        name: make_label("PT_OX_TANK"),
        scale: None,
    });
    let _ = c.events.push(energize("PURGE", -24_000, PURGE));
    let _ = c.events.push(energize("DELUGE", -8_000, DELUGE));
    let _ = c.events.push(energize("IGNITE", -3_000, IGNITE));
    let _ = c.events.push(energize("FIRE", 0, FIRE));
    let _ = c.interlocks.push(InterlockConfig {
        label: make_label("OX_TANK"),
        input: OX_TANK,
        limit: Limit::Above,
        threshold: Threshold::Value(3_500.0),
    });
    c
}

fn nominal() -> TelemetrySnapshot {
    TelemetrySnapshot::new().with(OX_TANK, 3_100.0)
}

/// Armed, abort-armed, main hold cleared, clock started at now = 0
fn start(config: &SequenceConfig, log: &mut MemoryLog<64>, stand: &mut Stand) -> SequenceSession {
    let mut session = SequenceSession::new(config, 0).unwrap();
    session.set_armed(true, log);
    session.set_abort_armed(true, log).unwrap();
    session.set_main_hold_cleared(true, 0, log);
    let report = session.process(0, &nominal(), stand, log);
    assert_eq!(report.state, SessionState::Counting);
    session
}

#[test]
fn scenario_a_scheduler_fires_each_event_once_in_order() {
    let config = hotfire();
    let mut scheduler = AutosequenceScheduler::new(&config.events, Authority::SEQUENCE).unwrap();
    let mut stand = Stand::new();
    let mut log = MemoryLog::<16>::new();
    let snapshot = nominal();
    let inputs = TickInputs {
        telemetry: &snapshot,
        hold_cleared: true,
        firing_enabled: true,
        held_from_ms: None,
    };

    for t in [-25_000, -9_000, -3_500, 100] {
        scheduler.tick(t, &inputs, &mut stand, &mut log);
    }

    assert_eq!(stand.sequence_energized(), [PURGE, DELUGE, IGNITE, FIRE]);
    assert_eq!(log.count("fired at"), 4);
}

#[test]
fn scenario_a_session_countdown() {
    let mut stand = Stand::new();
    let mut log = MemoryLog::<64>::new();
    let mut session = start(&hotfire(), &mut log, &mut stand);

    // T-time = -25000 + now while counting
    let fired: std::vec::Vec<std::vec::Vec<EventId>> = [16_000, 21_500, 25_100]
        .iter()
        .map(|now| {
            session
                .process(*now, &nominal(), &mut stand, &mut log)
                .scheduler
                .fired
                .to_vec()
        })
        .collect();

    assert_eq!(fired[0], [EventId(0)]);
    assert_eq!(fired[1], [EventId(1)]);
    assert_eq!(fired[2], [EventId(2), EventId(3)]);
    assert_eq!(stand.sequence_energized()[..4], [PURGE, DELUGE, IGNITE, FIRE]);
    assert_eq!(session.state(), SessionState::Complete);

    // Completion safes every tracked output
    assert_eq!(stand.output_state(IGNITE), Some(OutputState::Deenergized));
    assert_eq!(stand.output_state(FIRE), Some(OutputState::Deenergized));
    assert_eq!(stand.output_state(PURGE), Some(OutputState::Energized));
}

#[test]
fn scenario_b_prepress_stall() {
    let mut config = hotfire();
    let mut checks = Vec::new();
    let _ = checks.push(BandCheckConfig {
        input: OX_TANK,
        lower_setpoint: Some(3_000.0),
        upper_setpoint: Some(3_200.0),
    });
    config.validation = Some(ValidationConfig {
        label: make_label("PREPRESS"),
        trigger_ms: -9_000,
        timeout_ms: 10_000,
        margin: 0.0,
        checks,
    });
    let _ = config.events[2].guards.push(Guard::HoldCleared);
    let _ = config.events[3].guards.push(Guard::HoldCleared);

    let mut stand = Stand::new();
    let mut log = MemoryLog::<64>::new();
    let mut session = start(&config, &mut log, &mut stand);
    let low = TelemetrySnapshot::new().with(OX_TANK, 2_900.0);

    // Cross the trigger: clock pauses at T-8.9s
    let r = session.process(16_100, &low, &mut stand, &mut log);
    assert_eq!(r.state, SessionState::Validating);
    assert!(!r.clock_running);
    assert_eq!(r.t_ms, -8_900);

    let r = session.process(21_000, &low, &mut stand, &mut log);
    assert_eq!(r.state, SessionState::Validating);

    // 10 s elapse with the reading still out of band
    let r = session.process(26_100, &low, &mut stand, &mut log);
    assert_eq!(r.state, SessionState::Stalled);
    assert_eq!(r.t_ms, -8_900);
    assert!(!r.clock_running);
    assert!(log.contains("validation failed"));
    assert!(log.contains("prepress hold stalled"));
    assert!(!session.main_hold().is_cleared());
    assert!(!session.scheduler().is_fired(EventId(2)));

    // Still stalled later, nothing gated fires
    let r = session.process(60_000, &nominal(), &mut stand, &mut log);
    assert_eq!(r.state, SessionState::Stalled);
    assert_eq!(stand.energize_count(IGNITE), 0);

    // Operator re-clears: validation re-runs and passes
    session.set_main_hold_cleared(true, 60_000, &mut log);
    let r = session.process(60_100, &nominal(), &mut stand, &mut log);
    assert_eq!(r.state, SessionState::Counting);
    assert!(r.clock_running);
    session.process(66_200, &nominal(), &mut stand, &mut log);
    assert!(session.scheduler().is_fired(EventId(2)));
}

#[test]
fn scenario_c_trip_supersedes_ignition() {
    let mut stand = Stand::new();
    let mut log = MemoryLog::<64>::new();
    let mut session = start(&hotfire(), &mut log, &mut stand);
    session.process(21_500, &nominal(), &mut stand, &mut log);

    // Redline crosses on the tick that would fire IGNITE (T-2.9s)
    let hot = TelemetrySnapshot::new().with(OX_TANK, 3_600.0);
    let r = session.process(22_100, &hot, &mut stand, &mut log);
    assert!(r.state.is_aborted());
    assert!(r.scheduler.fired.is_empty());
    assert!(!r.clock_running);
    assert_eq!(r.records.len(), 1);
    assert_eq!(r.records[0].name.as_str(), "hotfire_abort_1");

    // Clock frozen: nothing further fires
    session.process(40_000, &hot, &mut stand, &mut log);
    assert_eq!(stand.energize_count(IGNITE), 0);
    assert_eq!(stand.energize_count(FIRE), 0);
    assert_eq!(stand.output_state(PURGE), Some(OutputState::Energized));
    assert!(log.contains("Safing complete"));
}

#[test]
fn scenario_d_rewind_rearms_without_new_session() {
    let mut stand = Stand::new();
    let mut log = MemoryLog::<64>::new();
    let mut session = start(&hotfire(), &mut log, &mut stand);

    let r = session.process(22_000, &nominal(), &mut stand, &mut log);
    assert_eq!(r.t_ms, -3_000);
    assert_eq!(session.scheduler().fired_count(), 2);

    session.adjust_clock(-23_000.0, 22_000, &mut log).unwrap();
    let r = session.process(22_000, &nominal(), &mut stand, &mut log);
    assert_eq!(r.t_ms, -26_000);
    assert_eq!(r.scheduler.rearmed.len(), 2);
    assert_eq!(r.state, SessionState::Idle);
    assert!(session.scheduler().events().iter().all(|e| !e.fired));
    assert!(!session.main_hold().is_cleared());

    // Clock still running: back into the window, held until re-cleared
    let r = session.process(23_000, &nominal(), &mut stand, &mut log);
    assert_eq!(r.t_ms, -25_000);
    assert!(matches!(r.state, SessionState::Holding(_)));
    session.set_main_hold_cleared(true, 23_000, &mut log);
    session.process(23_000, &nominal(), &mut stand, &mut log);

    for now in [24_000, 40_000, 48_100] {
        session.process(now, &nominal(), &mut stand, &mut log);
    }
    assert_eq!(session.state(), SessionState::Complete);
    // Two firings plus the completion safing of PURGE
    assert_eq!(stand.energize_count(PURGE), 3);
    assert_eq!(stand.energize_count(DELUGE), 2);
    assert_eq!(stand.energize_count(IGNITE), 1);
    assert_eq!(stand.energize_count(FIRE), 1);
}
