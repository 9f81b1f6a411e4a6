//! On-disk launch file layout
//!
//! Everything here is keyed by name. [`super::loader`] resolves names to
//! table indices and builds the core [`ignis_core::config::SequenceConfig`].

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchFile {
    pub name: String,
    #[serde(default = "default_start_ms")]
    pub start_ms: i64,
    #[serde(default = "default_pad_ms")]
    pub record_pad_ms: i64,
    #[serde(default)]
    pub authority: Option<AuthorityFile>,
    #[serde(default)]
    pub main_hold: Option<MainHoldFile>,
    #[serde(default, rename = "output")]
    pub outputs: Vec<OutputFile>,
    #[serde(default, rename = "input")]
    pub inputs: Vec<InputFile>,
    #[serde(default, rename = "event")]
    pub events: Vec<EventFile>,
    #[serde(default)]
    pub validation: Option<ValidationFile>,
    #[serde(default, rename = "interlock")]
    pub interlocks: Vec<InterlockFile>,
    #[serde(default)]
    pub supply: Option<SupplyFile>,
}

fn default_start_ms() -> i64 {
    -30_000
}

fn default_pad_ms() -> i64 {
    30_000
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorityFile {
    pub sequence: u8,
    pub abort: u8,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MainHoldFile {
    pub boundary_ms: i64,
    pub window_end_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateFile {
    Energized,
    Deenergized,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputFile {
    pub name: String,
    pub safe: StateFile,
    #[serde(default)]
    pub inverted: bool,
    /// Omitted outputs are not touched by safing
    #[serde(default)]
    pub safing_rank: Option<u8>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleFile {
    pub slope: f32,
    #[serde(default)]
    pub offset: f32,
    #[serde(default)]
    pub zero: f32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputFile {
    pub name: String,
    #[serde(default)]
    pub scale: Option<ScaleFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionFile {
    Set { output: String, state: StateFile },
    Pulse { output: String, duration_ms: u32 },
    Group { outputs: Vec<String>, state: StateFile },
    Mark,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum GuardFile {
    HoldCleared,
    AfterEvent {
        event: String,
    },
    InputAtLeast {
        input: String,
        #[serde(default)]
        threshold: Option<ThresholdFile>,
    },
    InputBelow {
        input: String,
        #[serde(default)]
        threshold: Option<ThresholdFile>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventFile {
    pub label: String,
    pub at_ms: i64,
    pub action: ActionFile,
    #[serde(default)]
    pub guards: Vec<GuardFile>,
}

/// A number, or the keyword `"disabled"`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ThresholdFile {
    Value(f32),
    Keyword(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandCheckFile {
    pub input: String,
    #[serde(default)]
    pub lower: Option<f32>,
    #[serde(default)]
    pub upper: Option<f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationFile {
    pub label: String,
    pub trigger_ms: i64,
    pub timeout_ms: u32,
    #[serde(default)]
    pub margin: f32,
    #[serde(default, rename = "check")]
    pub checks: Vec<BandCheckFile>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitFile {
    Above,
    Below,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterlockFile {
    pub label: String,
    pub input: String,
    pub limit: LimitFile,
    #[serde(default)]
    pub threshold: Option<ThresholdFile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SupplyFile {
    pub input: String,
    #[serde(default)]
    pub minimum: Option<ThresholdFile>,
}
