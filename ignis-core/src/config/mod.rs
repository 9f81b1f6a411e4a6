//! Configuration types
//!
//! Resolved, index-based launch configuration shared by the core and the
//! adapters.

pub mod hardware;
pub mod types;

pub use hardware::{InputConfig, LinearScale, OutputConfig, PointTable, MAX_OUTPUTS};
pub use types::{
    make_label, AuthorityConfig, BandCheckConfig, ConfigFault, EventConfig, InterlockConfig,
    Label, Limit, MainHoldConfig, SequenceConfig, SupplyConfig, Threshold, ValidationConfig,
    MAX_BAND_CHECKS, MAX_EVENTS, MAX_INTERLOCKS, MAX_LABEL_LEN,
};
