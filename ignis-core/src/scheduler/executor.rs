//! Autosequence scheduler
//!
//! Owns the trigger table. Each tick scans the table in ascending offset
//! order, re-arming events the clock has been wound back over and firing
//! due, unfired events whose guards hold.

use heapless::Vec;

use super::trigger::{guards_hold, Action, EventId, GuardContext, TriggerEvent};
use crate::clock::format_t_time;
use crate::config::{ConfigFault, EventConfig, MAX_EVENTS};
use crate::traits::{ActuationGateway, Authority, GatewayError, LogSink, Severity, TelemetrySnapshot};

/// Per-tick inputs from the session
pub struct TickInputs<'a> {
    /// Telemetry at the tick boundary
    pub telemetry: &'a TelemetrySnapshot,
    /// Validation hold cleared (or none configured)
    pub hold_cleared: bool,
    /// False while held: only the re-arm pass runs
    pub firing_enabled: bool,
    /// Events at or after this offset are held (validation wait)
    pub held_from_ms: Option<i64>,
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Events fired, in firing order
    pub fired: Vec<EventId, MAX_EVENTS>,
    /// Events re-armed by a rewind
    pub rearmed: Vec<EventId, MAX_EVENTS>,
    /// Events that hit a new guard or gateway fault
    pub faulted: Vec<EventId, MAX_EVENTS>,
}

/// Trigger table executor
#[derive(Debug, Clone)]
pub struct AutosequenceScheduler {
    /// Sorted by (offset, declaration index)
    events: Vec<TriggerEvent, MAX_EVENTS>,
    /// Authority for every scheduled write
    authority: Authority,
}

impl AutosequenceScheduler {
    /// Build the table from configuration
    ///
    /// Ties at equal offsets keep declaration order.
    pub fn new(configs: &[EventConfig], authority: Authority) -> Result<Self, ConfigFault> {
        let mut events = Vec::new();
        for (i, config) in configs.iter().enumerate() {
            let id = EventId(u8::try_from(i).map_err(|_| ConfigFault::TooManyEntries)?);
            events
                .push(TriggerEvent::from_config(id, config))
                .map_err(|_| ConfigFault::TooManyEntries)?;
        }
        events.sort_unstable_by_key(|e| (e.offset_ms, e.id));

        Ok(Self { events, authority })
    }

    /// Table rows in firing order
    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    /// Look up a row by id
    pub fn event(&self, id: EventId) -> Option<&TriggerEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Check if an event has fired in the current pass
    pub fn is_fired(&self, id: EventId) -> bool {
        self.event(id).is_some_and(|e| e.fired)
    }

    /// Check if every event has fired
    pub fn is_complete(&self) -> bool {
        self.events.iter().all(|e| e.fired)
    }

    /// Number of events fired in the current pass
    pub fn fired_count(&self) -> usize {
        self.events.iter().filter(|e| e.fired).count()
    }

    /// Last offset in the table, if any
    pub fn final_offset(&self) -> Option<i64> {
        self.events.last().map(|e| e.offset_ms)
    }

    /// First unfired event, for status display
    pub fn next_pending(&self) -> Option<&TriggerEvent> {
        self.events.iter().find(|e| !e.fired)
    }

    /// Scan the table once
    ///
    /// An event whose guard faults or whose action the gateway rejects is
    /// left unfired and retried on the next tick. Each fault episode is
    /// logged once.
    pub fn tick<G, L>(
        &mut self,
        current_t: i64,
        inputs: &TickInputs<'_>,
        gateway: &mut G,
        log: &mut L,
    ) -> TickReport
    where
        G: ActuationGateway + ?Sized,
        L: LogSink + ?Sized,
    {
        let mut report = TickReport::default();

        for i in 0..self.events.len() {
            if !self.events[i].is_due(current_t) {
                let event = &mut self.events[i];
                if event.fired {
                    event.fired = false;
                    event.faulted = false;
                    let _ = report.rearmed.push(event.id);
                }
                continue;
            }

            if self.events[i].fired || !inputs.firing_enabled {
                continue;
            }
            if inputs
                .held_from_ms
                .is_some_and(|limit| self.events[i].offset_ms >= limit)
            {
                continue;
            }

            let verdict = {
                let ctx = GuardContext {
                    telemetry: inputs.telemetry,
                    hold_cleared: inputs.hold_cleared,
                    events: &self.events,
                };
                guards_hold(&self.events[i].guards, &ctx)
            };

            let event = &mut self.events[i];
            match verdict {
                Ok(true) => {}
                Ok(false) => continue,
                Err(fault) => {
                    if !event.faulted {
                        event.faulted = true;
                        let _ = report.faulted.push(event.id);
                        log.record(
                            Severity::Warn,
                            format_args!("{} guard fault: {}", event.label, fault),
                        );
                    }
                    continue;
                }
            }

            match execute(&event.action, gateway, self.authority) {
                Ok(()) => {
                    event.fired = true;
                    event.faulted = false;
                    let _ = report.fired.push(event.id);
                    log.record(
                        Severity::Info,
                        format_args!("{} fired at {}", event.label, format_t_time(current_t)),
                    );
                }
                Err(e) => {
                    if !event.faulted {
                        event.faulted = true;
                        let _ = report.faulted.push(event.id);
                        log.record(
                            Severity::Warn,
                            format_args!("{} not fired: {}", event.label, e),
                        );
                    }
                }
            }
        }

        if !report.rearmed.is_empty() {
            log.record(
                Severity::Info,
                format_args!(
                    "{} events re-armed at {}",
                    report.rearmed.len(),
                    format_t_time(current_t)
                ),
            );
        }

        report
    }
}

/// Issue an action through the gateway
///
/// A group write attempts every member and reports the first failure.
fn execute<G>(action: &Action, gateway: &mut G, authority: Authority) -> Result<(), GatewayError>
where
    G: ActuationGateway + ?Sized,
{
    match action {
        Action::Set { output, state } => gateway.set_output(*output, *state, authority),
        Action::Pulse {
            output,
            duration_ms,
        } => gateway.pulse(*output, *duration_ms, authority),
        Action::SetGroup { outputs, state } => {
            let mut result = Ok(());
            for id in outputs {
                if let Err(e) = gateway.set_output(*id, *state, authority) {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            result
        }
        Action::Mark => Ok(()),
    }
}
