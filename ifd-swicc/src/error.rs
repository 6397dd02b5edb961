//! Handler-level errors
//!
//! Every failure the host can see ends up as an [`IfdError`], and every
//! [`IfdError`] maps to exactly one [`ResponseCode`]. Details go to the log,
//! only the code goes back to pcscd.

use std::io;

use thiserror::Error;

use crate::handler::ResponseCode;
use crate::power::PowerError;
use crate::session::SlotId;
use crate::transfer::TransferError;

#[derive(Debug, Error)]
pub enum IfdError {
    #[error("invalid Lun 0x{0:08X}")]
    InvalidLun(u64),

    #[error("unexpected device name {0:?}")]
    UnknownDevice(String),

    #[error("slot {0} already has a backend connection")]
    SlotBusy(SlotId),

    #[error("no channel is open")]
    NoSession,

    #[error("host passed a null {0} pointer")]
    NullPointer(&'static str),

    #[error("failed to open the listening socket: {0}")]
    Listen(#[source] io::Error),

    #[error("transfer failed: {0}")]
    Transfer(#[from] TransferError),

    #[error("power action failed: {0}")]
    Power(#[from] PowerError),

    #[error("unknown capability tag 0x{0:04X}")]
    UnknownTag(u64),

    #[error("capability tag 0x{0:04X} is read-only")]
    ReadOnlyTag(u64),

    #[error("protocol 0x{0:08X} is not supported")]
    ProtocolNotSupported(u64),

    #[error("PTS negotiation is not supported (flags 0x{0:02X})")]
    PtsNotSupported(u8),

    #[error("value of {needed} bytes does not fit in {available} bytes")]
    InsufficientBuffer { needed: usize, available: usize },

    #[error("operation not supported")]
    NotSupported,
}

impl IfdError {
    /// Result code reported to the host for this error
    pub fn response_code(&self) -> ResponseCode {
        match self {
            Self::InvalidLun(_)
            | Self::UnknownDevice(_)
            | Self::SlotBusy(_)
            | Self::NoSession
            | Self::NullPointer(_)
            | Self::Listen(_) => ResponseCode::CommunicationError,
            Self::Transfer(e) => match e {
                TransferError::Frame(frame) if frame.is_timeout() => ResponseCode::ResponseTimeout,
                TransferError::InsufficientBuffer { .. } => ResponseCode::InsufficientBuffer,
                _ => ResponseCode::CommunicationError,
            },
            Self::Power(e) => match e {
                PowerError::Frame(frame) if frame.is_timeout() => ResponseCode::ResponseTimeout,
                PowerError::InsufficientBuffer { .. } => ResponseCode::InsufficientBuffer,
                PowerError::Unsupported(_) => ResponseCode::NotSupported,
                _ => ResponseCode::CommunicationError,
            },
            Self::UnknownTag(_) => ResponseCode::ErrorTag,
            Self::ReadOnlyTag(_) => ResponseCode::ValueReadOnly,
            Self::ProtocolNotSupported(_) => ResponseCode::ProtocolNotSupported,
            Self::PtsNotSupported(_) | Self::NotSupported => ResponseCode::NotSupported,
            Self::InsufficientBuffer { .. } => ResponseCode::InsufficientBuffer,
        }
    }
}

impl From<&IfdError> for ResponseCode {
    fn from(e: &IfdError) -> Self {
        e.response_code()
    }
}
