//! Ignis Link Protocol
//!
//! This crate defines the binary framing shared by the telemetry feed (named
//! value updates flowing into the sequencer) and the command link (authority
//! tagged output commands, clock status and log lines flowing out).
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬──────┬─────────────┬──────────┐
//! │ START │ LENGTH │ TYPE │ PAYLOAD     │ CHECKSUM │
//! │ 1B    │ 1B     │ 1B   │ 0–250B      │ 1B       │
//! └───────┴────────┴──────┴─────────────┴──────────┘
//! ```
//!
//! Operator controls travel on the feed as ordinary value updates addressed
//! to reserved channel names; see [`controls`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod controls;
pub mod frame;
pub mod messages;

pub use controls::{Control, ControlChannel};
pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use messages::{FeedMessage, LinkMessage, MessageError, MAX_NAME_LEN};
