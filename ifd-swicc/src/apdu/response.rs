//! Response TPDU
//!
//! The final reply of a transfer: response data followed by SW1 SW2.

use super::APDUError;

/// A reassembled response TPDU
///
/// # Example
/// ```
/// use ifd_swicc::apdu::Tpdu;
///
/// let tpdu = Tpdu::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
/// assert_eq!(tpdu.sw(), 0x9000);
/// assert_eq!(tpdu.data, vec![0x01, 0x02]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tpdu {
    /// Response data (without status words)
    pub data: Vec<u8>,
    /// Status word 1 (SW1)
    pub sw1: u8,
    /// Status word 2 (SW2)
    pub sw2: u8,
}

impl Tpdu {
    /// Split raw response bytes into data and status word
    pub fn from_bytes(raw: &[u8]) -> Result<Self, APDUError> {
        if raw.len() < 2 {
            return Err(APDUError::ResponseTooShort(raw.len()));
        }
        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            sw1: sw[0],
            sw2: sw[1],
        })
    }

    /// Get the combined status word as u16
    pub fn sw(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Convert back to raw bytes (data + SW1 + SW2)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.data.len() + 2);
        result.extend_from_slice(&self.data);
        result.push(self.sw1);
        result.push(self.sw2);
        result
    }

    /// Total length in bytes (data + 2 status bytes)
    pub fn len(&self) -> usize {
        self.data.len() + 2
    }

    /// Check if response has no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only() {
        let tpdu = Tpdu::from_bytes(&[0x90, 0x00]).unwrap();
        assert_eq!(tpdu.sw(), 0x9000);
        assert!(tpdu.is_empty());
        assert_eq!(tpdu.len(), 2);
        assert_eq!(tpdu.to_bytes(), vec![0x90, 0x00]);
    }

    #[test]
    fn test_data_and_status() {
        let raw = [0xDE, 0xAD, 0xBE, 0xEF, 0x61, 0x10];
        let tpdu = Tpdu::from_bytes(&raw).unwrap();
        assert_eq!(tpdu.sw(), 0x6110);
        assert_eq!(tpdu.to_bytes(), raw.to_vec());
    }

    #[test]
    fn test_error_status() {
        let tpdu = Tpdu::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(tpdu.data.is_empty());
        assert_eq!((tpdu.sw1, tpdu.sw2), (0x6A, 0x82));
    }

    #[test]
    fn test_too_short() {
        assert_eq!(Tpdu::from_bytes(&[0x90]), Err(APDUError::ResponseTooShort(1)));
        assert_eq!(Tpdu::from_bytes(&[]), Err(APDUError::ResponseTooShort(0)));
    }
}
