//! Hardware-free core of the ignis autosequence engine
//!
//! This crate contains all sequencing logic that does not depend on a
//! particular I/O stack:
//!
//! - Countdown clock (freezable, adjustable T-time)
//! - Autosequence scheduler (exactly-once firing, re-arm on rewind)
//! - Main and validation holds
//! - Interlock monitor and safing routine
//! - Session state machine and session aggregate
//! - Gateway, log and telemetry traits
//! - Configuration type definitions

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod clock;
pub mod config;
pub mod hold;
pub mod record;
pub mod safety;
pub mod scheduler;
pub mod session;
pub mod state;
pub mod traits;

#[cfg(test)]
mod testing;

pub use session::{SequenceSession, SessionReport};
