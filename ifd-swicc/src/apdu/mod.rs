//! Command APDU handling for T=0 transfers
//!
//! Under T=0 a command always travels as a 5-byte header
//! (CLA INS P1 P2 P3) optionally followed by `Lc` data bytes. A trailing Le
//! byte is never transmitted; the card reports response availability through
//! status words instead.
//!
//! # Example
//! ```
//! use ifd_swicc::apdu::{Command, Case};
//!
//! // SELECT by AID with a trailing Le that T=0 drops
//! let raw = &[0x00, 0xA4, 0x04, 0x00, 0x02, 0x3F, 0x00, 0x00];
//! let cmd = Command::parse(raw).unwrap();
//! assert_eq!(cmd.as_bytes().len(), 7);
//! assert_eq!(cmd.case(), Case::Three { lc: 2 });
//! ```

mod procedure;
mod response;
mod status;

pub use procedure::{Procedure, NACK};
pub use response::Tpdu;
pub use status::SW;

use thiserror::Error;

/// Length of a T=0 command header (CLA INS P1 P2 P3)
pub const HEADER_LEN: usize = 5;

/// Errors that can occur while preparing a command
#[derive(Debug, Error, PartialEq, Eq)]
pub enum APDUError {
    #[error("APDU too short: expected at least {HEADER_LEN} bytes, got {0}")]
    TooShort(usize),

    #[error("Lc announces {lc} data bytes but only {available} were supplied")]
    TruncatedData { lc: usize, available: usize },

    #[error("response too short: expected at least 2 bytes, got {0}")]
    ResponseTooShort(usize),
}

/// ISO 7816-3 command case as seen by T=0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Case {
    /// Header only, P3 = 0
    One,
    /// Header only, P3 = Le (0 would mean 256, but that reads as case 1)
    Two { le: u8 },
    /// Header plus `lc` data bytes
    Three { lc: u8 },
}

/// A command trimmed to what actually goes on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    bytes: &'a [u8],
}

impl<'a> Command<'a> {
    /// Trim a raw command buffer to its effective T=0 length
    ///
    /// Anything past `5 + Lc` is discarded. A buffer holding fewer data bytes
    /// than `Lc` announces is rejected.
    pub fn parse(raw: &'a [u8]) -> Result<Self, APDUError> {
        if raw.len() < HEADER_LEN {
            return Err(APDUError::TooShort(raw.len()));
        }
        if raw.len() == HEADER_LEN {
            return Ok(Self { bytes: raw });
        }

        let lc = raw[4] as usize;
        let available = raw.len() - HEADER_LEN;
        if available < lc {
            return Err(APDUError::TruncatedData { lc, available });
        }
        Ok(Self {
            bytes: &raw[..HEADER_LEN + lc],
        })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Never true; a parsed command always holds a header
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn cla(&self) -> u8 {
        self.bytes[0]
    }

    pub fn ins(&self) -> u8 {
        self.bytes[1]
    }

    pub fn p1(&self) -> u8 {
        self.bytes[2]
    }

    pub fn p2(&self) -> u8 {
        self.bytes[3]
    }

    pub fn p3(&self) -> u8 {
        self.bytes[4]
    }

    /// Command data (empty for cases 1 and 2)
    pub fn data(&self) -> &'a [u8] {
        &self.bytes[HEADER_LEN..]
    }

    pub fn case(&self) -> Case {
        match (self.bytes.len() > HEADER_LEN, self.p3()) {
            (true, lc) => Case::Three { lc },
            (false, 0) => Case::One,
            (false, le) => Case::Two { le },
        }
    }
}
