//! Logical unit number decoding
//!
//! pcscd addresses a slot with a Lun whose upper 16 bits are the reader
//! number and lower 16 bits the slot number. This driver is always reader 0.

use crate::error::IfdError;
use crate::session::SlotId;

/// Map a Lun onto a slot, rejecting other readers and out-of-range slots
pub fn resolve(lun: u64) -> Result<SlotId, IfdError> {
    let reader = lun >> 16;
    let slot = (lun & 0xFFFF) as usize;
    if reader != 0 {
        return Err(IfdError::InvalidLun(lun));
    }
    SlotId::new(slot).ok_or(IfdError::InvalidLun(lun))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MAX_SLOTS;

    #[test]
    fn test_reader_zero() {
        assert_eq!(resolve(0).unwrap(), SlotId::MASTER);
        assert_eq!(resolve(5).unwrap().index(), 5);
        assert_eq!(resolve(MAX_SLOTS as u64 - 1).unwrap().index(), MAX_SLOTS - 1);
    }

    #[test]
    fn test_rejects_other_readers() {
        assert!(matches!(resolve(0x0001_0000), Err(IfdError::InvalidLun(0x0001_0000))));
        assert!(resolve(0x0002_0003).is_err());
        assert!(resolve(1 << 40).is_err());
    }

    #[test]
    fn test_rejects_slot_out_of_range() {
        assert!(resolve(MAX_SLOTS as u64).is_err());
        assert!(resolve(0xFFFF).is_err());
    }
}
