//! Error types for the sequencer process

use std::io;
use std::path::PathBuf;

use ignis_core::config::ConfigFault;
use thiserror::Error;

/// Launch file could not be turned into a sequence configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid launch file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown output \"{0}\"")]
    UnknownOutput(String),

    #[error("unknown input \"{0}\"")]
    UnknownInput(String),

    #[error("unknown event \"{0}\"")]
    UnknownEvent(String),

    #[error("duplicate name \"{0}\"")]
    Duplicate(String),

    #[error("name \"{0}\" exceeds {max} characters", max = ignis_core::config::MAX_LABEL_LEN)]
    NameTooLong(String),

    #[error("invalid threshold \"{0}\" (expected a number or \"disabled\")")]
    InvalidThreshold(String),

    #[error("too many {0}")]
    TooMany(&'static str),

    #[error("configuration rejected: {0}")]
    Fault(ConfigFault),
}

impl From<ConfigFault> for ConfigError {
    fn from(fault: ConfigFault) -> Self {
        ConfigError::Fault(fault)
    }
}

/// Failures that stop the process before the first tick
#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot reach stand at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot open log directory {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to start {0} thread: {1}")]
    Thread(&'static str, #[source] io::Error),
}

/// Session records could not be written
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("archive I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("archive encoding failed: {0}")]
    Encode(#[from] postcard::Error),
}
