//! Card contact state
//!
//! The backend models the physical contacts of the card interface as a
//! bitfield. The low nibble says which contacts are asserted, the high nibble
//! says which of those readings are valid.

/// Contact state bitfield shared with the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContactState(u32);

impl ContactState {
    pub const IO: u32 = 1 << 0;
    pub const CLK: u32 = 1 << 1;
    pub const RST: u32 = 1 << 2;
    pub const VCC: u32 = 1 << 3;
    pub const VALID_IO: u32 = 1 << 4;
    pub const VALID_CLK: u32 = 1 << 5;
    pub const VALID_RST: u32 = 1 << 6;
    pub const VALID_VCC: u32 = 1 << 7;

    /// Nothing asserted, nothing valid. Also what a cold reset request carries.
    pub const EMPTY: Self = Self(0);

    /// Every contact asserted and valid
    pub const READY: Self = Self(
        Self::IO
            | Self::CLK
            | Self::RST
            | Self::VCC
            | Self::VALID_IO
            | Self::VALID_CLK
            | Self::VALID_RST
            | Self::VALID_VCC,
    );

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check that every bit in `mask` is set
    pub const fn contains(self, mask: u32) -> bool {
        self.0 & mask == mask
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}
