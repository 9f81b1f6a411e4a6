//! Hardware-facing implementations
//!
//! This crate provides concrete implementations of the traits defined
//! in ignis-core:
//!
//! - Actuation gateways (framed command link, in-memory valve simulator)
//! - Scoped pulse helper for blocking hosts
//! - Pressure transducer scaling

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod gateway;
pub mod pulse;
pub mod sensor;

pub use gateway::{DeferredRelease, FramedGateway, PendingRelease, SimGateway};
pub use pulse::pulse_scoped;
pub use sensor::{PressureTransducer, SensorError};
