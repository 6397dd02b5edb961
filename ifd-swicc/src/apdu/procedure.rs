//! T=0 procedure bytes
//!
//! A one-byte reply during a transfer is a procedure byte. The backend echoes
//! INS (or its complement) to ask for more command bytes, or sends the NACK
//! byte to abort the exchange.

/// Procedure byte that aborts the transfer
pub const NACK: u8 = 0x60;

/// Meaning of a procedure byte relative to the command's INS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedure {
    /// 0x60: stop, send nothing more
    Nack,
    /// INS: send the remaining bytes
    Ack,
    /// !INS: send the next byte(s)
    AckComplement,
    /// Anything else is out of protocol
    Unexpected(u8),
}

impl Procedure {
    pub fn classify(byte: u8, ins: u8) -> Self {
        if byte == NACK {
            Self::Nack
        } else if byte == ins {
            Self::Ack
        } else if byte == !ins {
            Self::AckComplement
        } else {
            Self::Unexpected(byte)
        }
    }
}
