//! Ignis sequencer process
//!
//! Owns one [`ignis_core::SequenceSession`] and drives it from the telemetry
//! feed. Task layout:
//!
//! ```text
//!  stand socket ──► telemetry-rx thread ─┐
//!  stdin ─────────► console thread ──────┴► FEED_CHANNEL ─► feed_task
//!                                                              │
//!                       ┌──────────── Controller (mutex) ◄────┘
//!                       │
//!   tick_task ──► interlock_task      sequencer_task ──► release_task
//! ```

pub mod archive;
pub mod channels;
pub mod config;
pub mod console;
pub mod controller;
pub mod error;
pub mod log;
pub mod stand;
pub mod tasks;

// Std critical-section implementation for the embassy-sync primitives
use critical_section as _;

pub use controller::{Controller, Delivery};
pub use error::{ArchiveError, ConfigError, StartupError};
