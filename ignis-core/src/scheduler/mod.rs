//! Autosequence scheduler
//!
//! Time-triggered trigger table with exactly-once firing and re-arm on
//! rewind.

pub mod executor;
pub mod trigger;

pub use executor::{AutosequenceScheduler, TickInputs, TickReport};
pub use trigger::{
    guards_hold, Action, EventId, Guard, GuardContext, GuardFault, TriggerEvent, MAX_GROUP,
    MAX_GUARDS,
};
