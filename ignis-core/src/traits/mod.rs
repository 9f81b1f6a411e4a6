//! Hardware abstraction traits
//!
//! These traits define the interface between the sequencing logic
//! and the single adapter that touches physical I/O.

pub mod gateway;
pub mod log;
pub mod telemetry;

pub use gateway::{ActuationGateway, Authority, GatewayError, InputId, OutputId, OutputState};
pub use log::{LogSink, MemoryLog, NullLog, Severity, MEMORY_LINE_LEN};
pub use telemetry::{TelemetrySnapshot, MAX_INPUTS};
