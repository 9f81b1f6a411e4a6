//! Telemetry sensor conversions

mod transducer;

pub use transducer::{PressureTransducer, SensorError};
