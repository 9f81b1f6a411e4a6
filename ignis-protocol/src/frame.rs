//! Frame encoding and decoding
//!
//! Frame format:
//! - START (1 byte): 0xA5 synchronization byte
//! - LENGTH (1 byte): payload length (0-250)
//! - TYPE (1 byte): message type identifier
//! - PAYLOAD (0-250 bytes): type-specific data
//! - CHECKSUM (1 byte): XOR of LENGTH, TYPE, and all PAYLOAD bytes
//!
//! Both directions of the link are byte streams (TCP or serial), so the
//! parser is a push state machine that resynchronizes on the next START
//! byte after any error.

use heapless::Vec;

/// Frame synchronization byte
pub const FRAME_START: u8 = 0xA5;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 250;

/// Bytes around the payload: START, LENGTH, TYPE, CHECKSUM
const OVERHEAD: usize = 4;

/// Maximum complete frame size
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + OVERHEAD;

/// Errors that can occur during frame parsing or encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Payload exceeds maximum allowed size
    PayloadTooLarge,
    /// Checksum mismatch
    InvalidChecksum,
    /// LENGTH byte out of range
    InvalidLength(u8),
    /// Buffer too small for encoding
    BufferTooSmall,
}

impl core::fmt::Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::PayloadTooLarge => f.write_str("payload too large"),
            FrameError::InvalidChecksum => f.write_str("checksum mismatch"),
            FrameError::InvalidLength(n) => write!(f, "invalid length byte {}", n),
            FrameError::BufferTooSmall => f.write_str("encode buffer too small"),
        }
    }
}

fn checksum(length: u8, msg_type: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(length ^ msg_type, |acc, b| acc ^ b)
}

/// A parsed or constructed frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type identifier
    pub msg_type: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    pub fn new(msg_type: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let payload = Vec::from_slice(payload).map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(Self { msg_type, payload })
    }

    /// Frame with no payload
    pub fn empty(msg_type: u8) -> Self {
        Self {
            msg_type,
            payload: Vec::new(),
        }
    }

    /// Bytes this frame occupies on the wire
    pub fn encoded_len(&self) -> usize {
        self.payload.len() + OVERHEAD
    }

    /// Encode into `buffer`, returning the number of bytes written
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        let len = self.encoded_len();
        let out = buffer.get_mut(..len).ok_or(FrameError::BufferTooSmall)?;
        let length = self.payload.len() as u8;

        out[0] = FRAME_START;
        out[1] = length;
        out[2] = self.msg_type;
        out[3..len - 1].copy_from_slice(&self.payload);
        out[len - 1] = checksum(length, self.msg_type, &self.payload);
        Ok(len)
    }

    pub fn encode_to_vec(&self) -> Result<Vec<u8, MAX_FRAME_SIZE>, FrameError> {
        let mut buffer = [0u8; MAX_FRAME_SIZE];
        let len = self.encode(&mut buffer)?;
        Vec::from_slice(&buffer[..len]).map_err(|_| FrameError::BufferTooSmall)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Start,
    Length,
    Type,
    Payload,
    Checksum,
}

/// Push parser for a framed byte stream
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParseState,
    buffer: Vec<u8, MAX_PAYLOAD_SIZE>,
    length: u8,
    msg_type: u8,
    rejected: u32,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            state: ParseState::Start,
            buffer: Vec::new(),
            length: 0,
            msg_type: 0,
            rejected: 0,
        }
    }

    /// Drop any partial frame
    pub fn reset(&mut self) {
        self.state = ParseState::Start;
        self.buffer.clear();
        self.length = 0;
        self.msg_type = 0;
    }

    /// Frames rejected since creation
    pub fn rejected(&self) -> u32 {
        self.rejected
    }

    fn reject(&mut self, error: FrameError) -> Result<Option<Frame>, FrameError> {
        self.reset();
        self.rejected = self.rejected.saturating_add(1);
        Err(error)
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(frame))` when a frame completes, `Ok(None)` when
    /// more bytes are needed, or `Err` when the partial frame was dropped.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        match self.state {
            ParseState::Start => {
                // Noise between frames is skipped
                if byte == FRAME_START {
                    self.state = ParseState::Length;
                }
            }
            ParseState::Length => {
                if byte as usize > MAX_PAYLOAD_SIZE {
                    return self.reject(FrameError::InvalidLength(byte));
                }
                self.length = byte;
                self.state = ParseState::Type;
            }
            ParseState::Type => {
                self.msg_type = byte;
                self.buffer.clear();
                self.state = if self.length == 0 {
                    ParseState::Checksum
                } else {
                    ParseState::Payload
                };
            }
            ParseState::Payload => {
                // Bounded by the LENGTH check above
                let _ = self.buffer.push(byte);
                if self.buffer.len() == self.length as usize {
                    self.state = ParseState::Checksum;
                }
            }
            ParseState::Checksum => {
                if byte != checksum(self.length, self.msg_type, &self.buffer) {
                    return self.reject(FrameError::InvalidChecksum);
                }
                let frame = Frame {
                    msg_type: self.msg_type,
                    payload: core::mem::take(&mut self.buffer),
                };
                self.reset();
                return Ok(Some(frame));
            }
        }
        Ok(None)
    }

    /// Feed a whole read, handing every complete frame to `on_frame`
    ///
    /// Bad frames are counted and skipped; parsing continues with the next
    /// byte. Returns the number of frames delivered.
    pub fn feed_all<F: FnMut(Frame)>(&mut self, bytes: &[u8], mut on_frame: F) -> usize {
        let mut delivered = 0;
        for &byte in bytes {
            if let Ok(Some(frame)) = self.feed(byte) {
                on_frame(frame);
                delivered += 1;
            }
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse_one(bytes: &[u8]) -> std::vec::Vec<Frame> {
        let mut parser = FrameParser::new();
        let mut out = std::vec::Vec::new();
        parser.feed_all(bytes, |f| out.push(f));
        out
    }

    #[test]
    fn test_encode_empty_payload() {
        let frame = Frame::empty(0x02);
        let mut buffer = [0u8; 8];
        let len = frame.encode(&mut buffer).unwrap();

        assert_eq!(len, 4);
        assert_eq!(&buffer[..4], &[FRAME_START, 0, 0x02, 0x02]);
    }

    #[test]
    fn test_encode_checksum() {
        let frame = Frame::new(0x23, &[0x03, 0x10]).unwrap();
        let bytes = frame.encode_to_vec().unwrap();
        assert_eq!(bytes.as_slice(), &[FRAME_START, 2, 0x23, 0x03, 0x10, 2 ^ 0x23 ^ 0x03 ^ 0x10]);
    }

    #[test]
    fn test_buffer_too_small() {
        let frame = Frame::new(0x22, b"hello").unwrap();
        let mut buffer = [0u8; 8];
        assert_eq!(frame.encode(&mut buffer), Err(FrameError::BufferTooSmall));
    }

    #[test]
    fn test_invalid_checksum_then_resync() {
        let good = Frame::new(0x01, &[1, 2, 3]).unwrap().encode_to_vec().unwrap();
        let mut bad = good.clone();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;

        let mut parser = FrameParser::new();
        let mut result = Ok(None);
        for &b in bad.iter() {
            result = parser.feed(b);
        }
        assert_eq!(result, Err(FrameError::InvalidChecksum));
        assert_eq!(parser.rejected(), 1);

        let frames = parse_one(&[bad.as_slice(), good.as_slice()].concat());
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_length_out_of_range() {
        let mut parser = FrameParser::new();
        parser.feed(FRAME_START).unwrap();
        assert_eq!(parser.feed(251), Err(FrameError::InvalidLength(251)));
    }

    #[test]
    fn test_several_frames_in_one_read() {
        let a = Frame::empty(0x02).encode_to_vec().unwrap();
        let b = Frame::new(0x01, &[9]).unwrap().encode_to_vec().unwrap();
        let frames = parse_one(&[&[0x00, 0x13][..], a.as_slice(), b.as_slice(), a.as_slice()].concat());
        let types: std::vec::Vec<u8> = frames.iter().map(|f| f.msg_type).collect();
        assert_eq!(types, [0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_payload_too_large() {
        let large = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(Frame::new(0x22, &large), Err(FrameError::PayloadTooLarge));
    }

    proptest! {
        #[test]
        fn prop_frame_survives_leading_noise(
            noise in proptest::collection::vec(any::<u8>().prop_filter("not start", |b| *b != FRAME_START), 0..16),
            msg_type in any::<u8>(),
            payload in proptest::collection::vec(any::<u8>(), 0..=MAX_PAYLOAD_SIZE),
        ) {
            let frame = Frame::new(msg_type, &payload).unwrap();
            let encoded = frame.encode_to_vec().unwrap();
            let frames = parse_one(&[noise.as_slice(), encoded.as_slice()].concat());
            prop_assert_eq!(frames, std::vec![frame]);
        }
    }
}
