//! Reader capabilities reported through get/set capabilities

use crate::error::IfdError;
use crate::session::MAX_SLOTS;

use super::codes::{
    TAG_IFD_ATR, TAG_IFD_SIMULTANEOUS_ACCESS, TAG_IFD_SLOTS_NUMBER, TAG_IFD_SLOT_THREAD_SAFE,
    TAG_IFD_THREAD_SAFE,
};

/// Capability tags this reader knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// ATR of the card in the slot
    Atr,
    /// Number of readers the driver supports at once
    SimultaneousAccess,
    /// Whether entry points may be called concurrently across readers
    ThreadSafe,
    /// Whether entry points may be called concurrently across slots
    SlotThreadSafe,
    /// Number of slots on the reader
    SlotsNumber,
}

impl TryFrom<u64> for Capability {
    type Error = IfdError;

    fn try_from(tag: u64) -> Result<Self, Self::Error> {
        match tag {
            TAG_IFD_ATR => Ok(Self::Atr),
            TAG_IFD_SIMULTANEOUS_ACCESS => Ok(Self::SimultaneousAccess),
            TAG_IFD_THREAD_SAFE => Ok(Self::ThreadSafe),
            TAG_IFD_SLOT_THREAD_SAFE => Ok(Self::SlotThreadSafe),
            TAG_IFD_SLOTS_NUMBER => Ok(Self::SlotsNumber),
            other => Err(IfdError::UnknownTag(other)),
        }
    }
}

impl Capability {
    /// Value of a fixed, single-byte capability. `None` for the ATR, which
    /// depends on the slot.
    pub fn fixed_value(self) -> Option<u8> {
        match self {
            Self::Atr => None,
            Self::SimultaneousAccess => Some(1),
            Self::ThreadSafe | Self::SlotThreadSafe => Some(0),
            Self::SlotsNumber => Some(MAX_SLOTS as u8),
        }
    }
}

/// Copy `value` into `out` if it fits entirely
pub fn write_value(value: &[u8], out: &mut [u8]) -> Result<usize, IfdError> {
    if value.len() > out.len() {
        return Err(IfdError::InsufficientBuffer {
            needed: value.len(),
            available: out.len(),
        });
    }
    out[..value.len()].copy_from_slice(value);
    Ok(value.len())
}
