//! Message types carried in frames
//!
//! Message types are divided into two directions:
//! - Feed → sequencer: named value updates, heartbeats
//! - Sequencer → link: output commands, clock status, log lines, session state

use heapless::Vec;

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};

// Message type IDs: feed → sequencer
pub const MSG_VALUE: u8 = 0x01;
pub const MSG_HEARTBEAT: u8 = 0x02;

// Message type IDs: sequencer → link
pub const MSG_COMMAND: u8 = 0x20;
pub const MSG_CLOCK: u8 = 0x21;
pub const MSG_LOG: u8 = 0x22;
pub const MSG_STATUS: u8 = 0x23;

/// Longest point or channel name on the wire
pub const MAX_NAME_LEN: usize = 32;

/// Errors decoding or encoding a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MessageError {
    /// Framing layer rejected the message
    Frame(FrameError),
    /// Type byte not valid in this direction
    UnknownType(u8),
    /// Payload shorter than its fields
    Truncated,
    /// Name is empty, too long or not UTF-8
    InvalidName,
}

impl From<FrameError> for MessageError {
    fn from(e: FrameError) -> Self {
        MessageError::Frame(e)
    }
}

impl core::fmt::Display for MessageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MessageError::Frame(e) => write!(f, "frame error: {}", e),
            MessageError::UnknownType(t) => write!(f, "unknown message type 0x{:02x}", t),
            MessageError::Truncated => f.write_str("payload truncated"),
            MessageError::InvalidName => f.write_str("invalid name"),
        }
    }
}

type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

fn push_name(payload: &mut Payload, name: &str) -> Result<(), MessageError> {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_NAME_LEN {
        return Err(MessageError::InvalidName);
    }
    payload
        .push(bytes.len() as u8)
        .map_err(|_| FrameError::PayloadTooLarge)?;
    payload
        .extend_from_slice(bytes)
        .map_err(|_| FrameError::PayloadTooLarge)?;
    Ok(())
}

/// Split `[len][name]` off the front of `bytes`
fn take_name(bytes: &[u8]) -> Result<(&str, &[u8]), MessageError> {
    let (&len, rest) = bytes.split_first().ok_or(MessageError::Truncated)?;
    let len = len as usize;
    if len == 0 || len > MAX_NAME_LEN {
        return Err(MessageError::InvalidName);
    }
    if rest.len() < len {
        return Err(MessageError::Truncated);
    }
    let (name, rest) = rest.split_at(len);
    let name = core::str::from_utf8(name).map_err(|_| MessageError::InvalidName)?;
    Ok((name, rest))
}

/// Longest prefix of `text` that fits in `max` bytes on a char boundary
fn clip(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Inbound telemetry feed messages
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedMessage<'a> {
    /// Named value update; every delivery is a tick boundary
    Value { name: &'a str, value: f32 },
    /// Link keep-alive
    Heartbeat,
}

impl<'a> FeedMessage<'a> {
    /// Parse from a frame, borrowing the name
    pub fn from_frame(frame: &'a Frame) -> Result<Self, MessageError> {
        match frame.msg_type {
            MSG_VALUE => {
                let (name, rest) = take_name(&frame.payload)?;
                let raw: [u8; 4] = rest
                    .get(..4)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(MessageError::Truncated)?;
                Ok(FeedMessage::Value {
                    name,
                    value: f32::from_le_bytes(raw),
                })
            }
            MSG_HEARTBEAT => Ok(FeedMessage::Heartbeat),
            other => Err(MessageError::UnknownType(other)),
        }
    }

    /// Encode (used by feed simulators and tests)
    pub fn to_frame(&self) -> Result<Frame, MessageError> {
        match self {
            FeedMessage::Value { name, value } => {
                let mut payload = Payload::new();
                push_name(&mut payload, name)?;
                payload
                    .extend_from_slice(&value.to_le_bytes())
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                Ok(Frame::new(MSG_VALUE, &payload)?)
            }
            FeedMessage::Heartbeat => Ok(Frame::empty(MSG_HEARTBEAT)),
        }
    }
}

/// Outbound command link messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMessage<'a> {
    /// Drive a named output to a wire level under an authority
    Command {
        authority: u8,
        level: bool,
        name: &'a str,
    },
    /// Countdown clock status
    Clock { t_ms: i64, running: bool },
    /// Human-readable log line; clipped to one frame
    Log(&'a str),
    /// Session state code
    Status(u8),
}

impl<'a> LinkMessage<'a> {
    pub fn to_frame(&self) -> Result<Frame, MessageError> {
        match self {
            LinkMessage::Command {
                authority,
                level,
                name,
            } => {
                let mut payload = Payload::new();
                payload
                    .extend_from_slice(&[*authority, *level as u8])
                    .map_err(|_| FrameError::PayloadTooLarge)?;
                push_name(&mut payload, name)?;
                Ok(Frame::new(MSG_COMMAND, &payload)?)
            }
            LinkMessage::Clock { t_ms, running } => {
                let mut payload = [0u8; 9];
                payload[..8].copy_from_slice(&t_ms.to_le_bytes());
                payload[8] = *running as u8;
                Ok(Frame::new(MSG_CLOCK, &payload)?)
            }
            LinkMessage::Log(text) => {
                Ok(Frame::new(MSG_LOG, clip(text, MAX_PAYLOAD_SIZE).as_bytes())?)
            }
            LinkMessage::Status(code) => Ok(Frame::new(MSG_STATUS, &[*code])?),
        }
    }

    /// Parse from a frame (used by link simulators and tests)
    pub fn from_frame(frame: &'a Frame) -> Result<Self, MessageError> {
        let p = frame.payload.as_slice();
        match frame.msg_type {
            MSG_COMMAND => {
                if p.len() < 2 {
                    return Err(MessageError::Truncated);
                }
                let (head, rest) = p.split_at(2);
                let (name, _) = take_name(rest)?;
                Ok(LinkMessage::Command {
                    authority: head[0],
                    level: head[1] != 0,
                    name,
                })
            }
            MSG_CLOCK => {
                let raw: [u8; 8] = p
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(MessageError::Truncated)?;
                let running = *p.get(8).ok_or(MessageError::Truncated)? != 0;
                Ok(LinkMessage::Clock {
                    t_ms: i64::from_le_bytes(raw),
                    running,
                })
            }
            MSG_LOG => {
                let text = core::str::from_utf8(p).map_err(|_| MessageError::InvalidName)?;
                Ok(LinkMessage::Log(text))
            }
            MSG_STATUS => Ok(LinkMessage::Status(
                *p.first().ok_or(MessageError::Truncated)?,
            )),
            other => Err(MessageError::UnknownType(other)),
        }
    }
}
