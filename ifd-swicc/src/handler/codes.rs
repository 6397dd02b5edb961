//! Numeric values shared with pcscd

/// Result codes returned by every IFD handler entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ResponseCode {
    Success = 0,
    ErrorTag = 600,
    SetFailure = 601,
    ValueReadOnly = 602,
    PtsFailure = 605,
    NotSupported = 606,
    ProtocolNotSupported = 607,
    PowerAction = 608,
    CommunicationError = 612,
    ResponseTimeout = 613,
    IccPresent = 615,
    IccNotPresent = 616,
    NoSuchDevice = 617,
    InsufficientBuffer = 618,
}

impl ResponseCode {
    /// Raw value handed back to pcscd
    pub fn code(self) -> u32 {
        self as u32
    }
}

// Capability tags
pub const TAG_IFD_ATR: u64 = 0x0303;
pub const TAG_IFD_SIMULTANEOUS_ACCESS: u64 = 0x0FAF;
pub const TAG_IFD_THREAD_SAFE: u64 = 0x0FAD;
pub const TAG_IFD_SLOT_THREAD_SAFE: u64 = 0x0FAC;
pub const TAG_IFD_SLOTS_NUMBER: u64 = 0x0FAE;

// Protocols
pub const SCARD_PROTOCOL_T0: u64 = 0x0000_0001;
pub const SCARD_PROTOCOL_T1: u64 = 0x0000_0002;
pub const SCARD_PROTOCOL_DEFAULT: u64 = 0x8000_0000;
