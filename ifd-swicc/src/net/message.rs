//! Wire message exchanged with the swICC backend
//!
//! Layout on the wire (all integers little-endian):
//!
//! ```text
//! [size:4] [cont_state:4] [ctrl:4] [buf_len_exp:4] [buf:size-12]
//! ```
//!
//! `size` counts every byte after the header, so it is always at least
//! [`BODY_FIXED_SIZE`] and at most [`BODY_FIXED_SIZE`] + [`MAX_BUF_SIZE`].

use std::fmt;

use super::contact::ContactState;
use super::FrameError;

/// Size of the header carrying the payload size
pub const HEADER_SIZE: usize = 4;

/// Size of the fixed body fields that precede the buffer
pub const BODY_FIXED_SIZE: usize = 12;

/// Largest buffer a message can carry: a short command header, 255 data
/// bytes and Le. Also covers a 256 byte response plus status word.
pub const MAX_BUF_SIZE: usize = 5 + 255 + 1;

/// Largest value the header size field may hold
pub const MAX_PAYLOAD_SIZE: usize = BODY_FIXED_SIZE + MAX_BUF_SIZE;

/// Control code carried by every message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ControlCode {
    /// Plain data, no control request
    None = 0,
    Success = 1,
    Failure = 2,
    KeepAlive = 3,
    ResetColdPpsY = 4,
    ResetColdPpsN = 5,
    ResetWarmPpsY = 6,
    ResetWarmPpsN = 7,
}

impl ControlCode {
    /// Whether this code requests a card reset of any kind
    pub fn is_reset(self) -> bool {
        matches!(
            self,
            Self::ResetColdPpsY | Self::ResetColdPpsN | Self::ResetWarmPpsY | Self::ResetWarmPpsN
        )
    }
}

impl TryFrom<u32> for ControlCode {
    type Error = FrameError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::None,
            1 => Self::Success,
            2 => Self::Failure,
            3 => Self::KeepAlive,
            4 => Self::ResetColdPpsY,
            5 => Self::ResetColdPpsN,
            6 => Self::ResetWarmPpsY,
            7 => Self::ResetWarmPpsN,
            other => return Err(FrameError::UnknownControl(other)),
        })
    }
}

/// A single framed message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Contact state echoed with the backend
    pub contact: ContactState,
    /// Control request
    pub ctrl: ControlCode,
    /// Number of bytes the backend wants next. Only meaningful when the
    /// backend is the sender; zero on everything we send.
    pub expected_len: u32,
    /// Message buffer, at most [`MAX_BUF_SIZE`] bytes
    pub buf: Vec<u8>,
}

impl Message {
    /// Plain data message carrying `buf`
    pub fn data(contact: ContactState, buf: &[u8]) -> Self {
        Self {
            contact,
            ctrl: ControlCode::None,
            expected_len: 0,
            buf: buf.to_vec(),
        }
    }

    /// Control-only message with an empty buffer
    pub fn control(contact: ContactState, ctrl: ControlCode) -> Self {
        Self {
            contact,
            ctrl,
            expected_len: 0,
            buf: Vec::new(),
        }
    }

    /// Value of the header size field for this message
    pub fn payload_size(&self) -> usize {
        BODY_FIXED_SIZE + self.buf.len()
    }

    /// Encode header and payload into one contiguous frame
    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.buf.len() > MAX_BUF_SIZE {
            return Err(FrameError::Oversized(self.payload_size()));
        }
        let size = self.payload_size();
        let mut frame = Vec::with_capacity(HEADER_SIZE + size);
        frame.extend_from_slice(&(size as u32).to_le_bytes());
        frame.extend_from_slice(&self.contact.bits().to_le_bytes());
        frame.extend_from_slice(&(self.ctrl as u32).to_le_bytes());
        frame.extend_from_slice(&self.expected_len.to_le_bytes());
        frame.extend_from_slice(&self.buf);
        Ok(frame)
    }

    /// Decode a payload (everything after the header)
    pub fn decode_payload(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() < BODY_FIXED_SIZE {
            return Err(FrameError::Undersized(payload.len()));
        }
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::Oversized(payload.len()));
        }
        let word = |at: usize| {
            u32::from_le_bytes([payload[at], payload[at + 1], payload[at + 2], payload[at + 3]])
        };
        Ok(Self {
            contact: ContactState::from_bits(word(0)),
            ctrl: ControlCode::try_from(word(4))?,
            expected_len: word(8),
            buf: payload[BODY_FIXED_SIZE..].to_vec(),
        })
    }
}

/// Validate a header size field before anything else is read
pub fn check_payload_size(size: usize) -> Result<usize, FrameError> {
    if size < BODY_FIXED_SIZE {
        Err(FrameError::Undersized(size))
    } else if size > MAX_PAYLOAD_SIZE {
        Err(FrameError::Oversized(size))
    } else {
        Ok(size)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(Message\n    (Header (Size {}))\n    (Data\n        (Cont 0x{:08X})\n        (Ctrl {:?})\n        (BufLenExp {})\n        (Buf [",
            self.payload_size(),
            self.contact.bits(),
            self.ctrl,
            self.expected_len,
        )?;
        if self.buf.len() > MAX_BUF_SIZE {
            write!(f, " invalid")?;
        } else {
            for byte in &self.buf {
                write!(f, " {}", hex::encode_upper([*byte]))?;
            }
        }
        write!(f, " ])))")
    }
}
