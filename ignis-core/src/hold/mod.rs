//! Hold management
//!
//! The main hold gates the sequence window on operator permissives; the
//! validation hold gates the pyro group on tank pressures.

pub mod band;
pub mod main_hold;
pub mod validation;

pub use band::{Band, BandCheck};
pub use main_hold::{HoldDirective, HoldReason, MainHold, Permissives};
pub use validation::{
    ClearReason, HoldError, ValidationHold, ValidationOutcome, ValidationPhase,
};
