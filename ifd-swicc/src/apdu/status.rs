//! Status Word (SW) constants for response TPDUs

/// Status Word constants
pub struct SW;

impl SW {
    pub const SUCCESS: u16 = 0x9000;
    pub const WRONG_LENGTH: u16 = 0x6700;

    /// Check if a status word indicates more data available (61xx)
    #[inline]
    pub fn is_more_data(sw: u16) -> bool {
        (sw & 0xFF00) == 0x6100
    }

    /// Check if the card asks for the command again with a corrected Le (6Cxx)
    #[inline]
    pub fn is_wrong_le(sw: u16) -> bool {
        (sw & 0xFF00) == 0x6C00
    }
}
