//! Session state machine
//!
//! Explicit, finite and deterministic view of where a session is.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::SessionState;
