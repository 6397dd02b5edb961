//! ATR (Answer To Reset) handling
//!
//! The ATR is produced by the backend on every cold reset. The reader only
//! validates its length and caches it for later power-up requests.

use thiserror::Error;

/// Maximum ATR size (ISO 7816-3)
pub const MAX_ATR_SIZE: usize = 33;

/// Errors for ATRs coming back from the backend
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AtrError {
    #[error("backend returned an empty ATR")]
    Empty,

    #[error("ATR too long: got {0} bytes, maximum is {MAX_ATR_SIZE}")]
    TooLong(usize),
}

/// A cached ATR. Length 0 means nothing cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Atr {
    bytes: [u8; MAX_ATR_SIZE],
    len: usize,
}

impl Default for Atr {
    fn default() -> Self {
        Self {
            bytes: [0u8; MAX_ATR_SIZE],
            len: 0,
        }
    }
}

impl Atr {
    /// Validate and copy an ATR
    pub fn new(data: &[u8]) -> Result<Self, AtrError> {
        if data.is_empty() {
            return Err(AtrError::Empty);
        }
        if data.len() > MAX_ATR_SIZE {
            return Err(AtrError::TooLong(data.len()));
        }
        let mut atr = Self::default();
        atr.bytes[..data.len()].copy_from_slice(data);
        atr.len = data.len();
        Ok(atr)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forget the cached ATR
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_empty() {
        let atr = Atr::default();
        assert!(atr.is_empty());
        assert_eq!(atr.as_bytes(), &[] as &[u8]);
    }

    #[test]
    fn test_new_and_clear() {
        let mut atr = Atr::new(&[0x3B, 0x02, 0x14, 0x50]).unwrap();
        assert_eq!(atr.len(), 4);
        assert_eq!(atr.as_bytes(), &[0x3B, 0x02, 0x14, 0x50]);
        atr.clear();
        assert!(atr.is_empty());
    }

    #[test]
    fn test_bounds() {
        assert_eq!(Atr::new(&[]), Err(AtrError::Empty));
        assert!(Atr::new(&[0x3B; MAX_ATR_SIZE]).is_ok());
        assert_eq!(Atr::new(&[0x3B; MAX_ATR_SIZE + 1]), Err(AtrError::TooLong(34)));
    }
}
