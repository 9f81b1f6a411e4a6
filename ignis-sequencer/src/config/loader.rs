//! Launch file loading
//!
//! Parses a launch file and resolves every name against the point tables,
//! producing a validated [`SequenceConfig`]. A missing threshold resolves to
//! [`Threshold::Unset`], never to "no limit".

use std::fs;
use std::path::{Path, PathBuf};

use heapless::Vec as HVec;
use ignis_core::config::{
    make_label, AuthorityConfig, BandCheckConfig, EventConfig, InputConfig, InterlockConfig, Label,
    Limit, LinearScale, MainHoldConfig, OutputConfig, PointTable, SequenceConfig, SupplyConfig,
    Threshold, ValidationConfig, MAX_LABEL_LEN,
};
use ignis_core::scheduler::{Action, EventId, Guard};
use ignis_core::traits::{Authority, InputId, OutputId, OutputState};
use tracing::{debug, info};

use super::file::{
    ActionFile, EventFile, GuardFile, LaunchFile, LimitFile, StateFile, ThresholdFile,
};
use crate::error::ConfigError;

/// Compiled-in launch file, validated by the build script
pub const EMBEDDED_CONFIG: &str = include_str!("../../launch.toml");

/// Where the launch file comes from; re-read on every reload
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Embedded,
}

impl ConfigSource {
    pub fn from_arg(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => ConfigSource::File(path),
            None => ConfigSource::Embedded,
        }
    }

    /// Read and resolve the launch file
    pub fn load(&self) -> Result<SequenceConfig, ConfigError> {
        match self {
            ConfigSource::File(path) => {
                info!("Loading launch file {}", path.display());
                load_file(path)
            }
            ConfigSource::Embedded => {
                info!("Using embedded launch file");
                parse_config(EMBEDDED_CONFIG)
            }
        }
    }
}

/// Read and resolve a launch file from disk
pub fn load_file(path: &Path) -> Result<SequenceConfig, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parse launch file text into a validated configuration
pub fn parse_config(text: &str) -> Result<SequenceConfig, ConfigError> {
    let file: LaunchFile = toml::from_str(text)?;
    let config = resolve(&file)?;
    config.validate()?;
    debug!(
        outputs = config.points.outputs.len(),
        inputs = config.points.inputs.len(),
        events = config.events.len(),
        "Launch file resolved"
    );
    Ok(config)
}

fn resolve(file: &LaunchFile) -> Result<SequenceConfig, ConfigError> {
    let mut config = SequenceConfig {
        name: label(&file.name)?,
        start_ms: file.start_ms,
        record_pad_ms: file.record_pad_ms,
        ..SequenceConfig::default()
    };

    if let Some(authority) = file.authority {
        config.authority = AuthorityConfig {
            sequence: Authority(authority.sequence),
            abort: Authority(authority.abort),
        };
    }
    if let Some(hold) = file.main_hold {
        config.main_hold = MainHoldConfig {
            boundary_ms: hold.boundary_ms,
            window_end_ms: hold.window_end_ms,
        };
    }

    config.points = resolve_points(file)?;
    let points = &config.points;

    for event in &file.events {
        let resolved = resolve_event(event, &file.events, points)?;
        config
            .events
            .push(resolved)
            .map_err(|_| ConfigError::TooMany("events"))?;
    }

    if let Some(validation) = &file.validation {
        let mut checks = HVec::new();
        for check in &validation.checks {
            checks
                .push(BandCheckConfig {
                    input: find_input(points, &check.input)?,
                    lower_setpoint: check.lower,
                    upper_setpoint: check.upper,
                })
                .map_err(|_| ConfigError::TooMany("band checks"))?;
        }
        config.validation = Some(ValidationConfig {
            label: label(&validation.label)?,
            trigger_ms: validation.trigger_ms,
            timeout_ms: validation.timeout_ms,
            margin: validation.margin,
            checks,
        });
    }

    for interlock in &file.interlocks {
        config
            .interlocks
            .push(InterlockConfig {
                label: label(&interlock.label)?,
                input: find_input(points, &interlock.input)?,
                limit: match interlock.limit {
                    LimitFile::Above => Limit::Above,
                    LimitFile::Below => Limit::Below,
                },
                threshold: threshold(interlock.threshold.as_ref())?,
            })
            .map_err(|_| ConfigError::TooMany("interlocks"))?;
    }

    if let Some(supply) = &file.supply {
        config.supply = Some(SupplyConfig {
            input: find_input(points, &supply.input)?,
            minimum: threshold(supply.minimum.as_ref())?,
        });
    }

    Ok(config)
}

fn resolve_points(file: &LaunchFile) -> Result<PointTable, ConfigError> {
    let mut points = PointTable::new();

    for output in &file.outputs {
        if points.find_output(&output.name).is_some() {
            return Err(ConfigError::Duplicate(output.name.clone()));
        }
        points
            .outputs
            .push(OutputConfig {
                name: label(&output.name)?,
                safe_state: state(output.safe),
                inverted: output.inverted,
                safing_rank: output.safing_rank,
            })
            .map_err(|_| ConfigError::TooMany("outputs"))?;
    }

    for input in &file.inputs {
        if points.find_input(&input.name).is_some() {
            return Err(ConfigError::Duplicate(input.name.clone()));
        }
        points
            .inputs
            .push(InputConfig {
                name: label(&input.name)?,
                scale: input.scale.map(|s| LinearScale {
                    slope: s.slope,
                    offset: s.offset,
                    zero_offset: s.zero,
                }),
            })
            .map_err(|_| ConfigError::TooMany("inputs"))?;
    }

    Ok(points)
}

fn resolve_event(
    event: &EventFile,
    all: &[EventFile],
    points: &PointTable,
) -> Result<EventConfig, ConfigError> {
    let action = match &event.action {
        ActionFile::Set { output, state: s } => Action::Set {
            output: find_output(points, output)?,
            state: state(*s),
        },
        ActionFile::Pulse {
            output,
            duration_ms,
        } => Action::Pulse {
            output: find_output(points, output)?,
            duration_ms: *duration_ms,
        },
        ActionFile::Group { outputs, state: s } => {
            let mut ids = HVec::new();
            for name in outputs {
                ids.push(find_output(points, name)?)
                    .map_err(|_| ConfigError::TooMany("outputs in a group"))?;
            }
            Action::SetGroup {
                outputs: ids,
                state: state(*s),
            }
        }
        ActionFile::Mark => Action::Mark,
    };

    let mut guards = HVec::new();
    for guard in &event.guards {
        let resolved = match guard {
            GuardFile::HoldCleared => Guard::HoldCleared,
            GuardFile::AfterEvent { event: name } => {
                let index = all
                    .iter()
                    .position(|e| e.label == *name)
                    .ok_or_else(|| ConfigError::UnknownEvent(name.clone()))?;
                Guard::AfterEvent(EventId(index as u8))
            }
            GuardFile::InputAtLeast { input, threshold: t } => Guard::InputAtLeast {
                input: find_input(points, input)?,
                threshold: threshold(t.as_ref())?,
            },
            GuardFile::InputBelow { input, threshold: t } => Guard::InputBelow {
                input: find_input(points, input)?,
                threshold: threshold(t.as_ref())?,
            },
        };
        guards
            .push(resolved)
            .map_err(|_| ConfigError::TooMany("guards on one event"))?;
    }

    Ok(EventConfig {
        label: label(&event.label)?,
        offset_ms: event.at_ms,
        action,
        guards,
    })
}

fn label(name: &str) -> Result<Label, ConfigError> {
    if name.len() > MAX_LABEL_LEN {
        return Err(ConfigError::NameTooLong(name.to_string()));
    }
    Ok(make_label(name))
}

fn state(s: StateFile) -> OutputState {
    match s {
        StateFile::Energized => OutputState::Energized,
        StateFile::Deenergized => OutputState::Deenergized,
    }
}

fn threshold(t: Option<&ThresholdFile>) -> Result<Threshold, ConfigError> {
    match t {
        None => Ok(Threshold::Unset),
        Some(ThresholdFile::Value(v)) => Ok(Threshold::Value(*v)),
        Some(ThresholdFile::Keyword(k)) if k == "disabled" => Ok(Threshold::Disabled),
        Some(ThresholdFile::Keyword(k)) => Err(ConfigError::InvalidThreshold(k.clone())),
    }
}

fn find_output(points: &PointTable, name: &str) -> Result<OutputId, ConfigError> {
    points
        .find_output(name)
        .ok_or_else(|| ConfigError::UnknownOutput(name.to_string()))
}

fn find_input(points: &PointTable, name: &str) -> Result<InputId, ConfigError> {
    points
        .find_input(name)
        .ok_or_else(|| ConfigError::UnknownInput(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        name = "coldflow"

        [[output]]
        name = "IGNITOR_cmd"
        safe = "deenergized"
        safing_rank = 0

        [[input]]
        name = "PT_OX_201"

        [[event]]
        label = "IGNITE"
        at_ms = -3000
        action = { kind = "pulse", output = "IGNITOR_cmd", duration_ms = 500 }

        [[interlock]]
        label = "OX redline"
        input = "PT_OX_201"
        limit = "above"
    "#;

    #[test]
    fn test_embedded_config_parses() {
        let config = parse_config(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config.name.as_str(), "launch");
        assert_eq!(config.events.len(), 8);
        assert_eq!(config.interlocks.len(), 2);
        assert!(config.validation.is_some());
        assert_eq!(
            config.events[6].guards[1],
            Guard::AfterEvent(EventId(5))
        );
    }

    #[test]
    fn test_reparse_compares_point_tables() {
        let first = parse_config(EMBEDDED_CONFIG).unwrap();
        assert_eq!(first, parse_config(EMBEDDED_CONFIG).unwrap());

        let renamed = parse_config(&EMBEDDED_CONFIG.replace("PT_HE_201", "PT_HE_202")).unwrap();
        assert_ne!(first.points, renamed.points);
        assert_ne!(first, renamed);
    }

    #[test]
    fn test_defaults_and_missing_threshold() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.start_ms, -30_000);
        assert_eq!(config.authority, AuthorityConfig::default());
        assert_eq!(config.interlocks[0].threshold, Threshold::Unset);
        assert_eq!(
            config.events[0].action,
            Action::Pulse {
                output: OutputId(0),
                duration_ms: 500
            }
        );
    }

    #[test]
    fn test_unknown_output_name() {
        let text = MINIMAL.replace("output = \"IGNITOR_cmd\"", "output = \"IGNITER_cmd\"");
        match parse_config(&text) {
            Err(ConfigError::UnknownOutput(name)) => assert_eq!(name, "IGNITER_cmd"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_disabled_and_bad_keyword() {
        let text = format!("{}threshold = \"disabled\"\n", MINIMAL);
        let config = parse_config(&text).unwrap();
        assert_eq!(config.interlocks[0].threshold, Threshold::Disabled);

        let text = format!("{}threshold = \"off\"\n", MINIMAL);
        assert!(matches!(
            parse_config(&text),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_duplicate_output() {
        let text = format!(
            "{}\n[[output]]\nname = \"IGNITOR_cmd\"\nsafe = \"energized\"\n",
            MINIMAL
        );
        assert!(matches!(parse_config(&text), Err(ConfigError::Duplicate(_))));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let text = format!(
            "{}\n[main_hold]\nboundary_ms = 5000\nwindow_end_ms = 0\n",
            MINIMAL
        );
        assert!(matches!(parse_config(&text), Err(ConfigError::Fault(_))));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            parse_config("name = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let source = ConfigSource::File(PathBuf::from("/nonexistent/launch.toml"));
        assert!(matches!(source.load(), Err(ConfigError::Read { .. })));
    }
}
