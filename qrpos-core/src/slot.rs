//! Device storage slots

use std::fmt;

use crate::constants::{IMAGE_EXTENSION, MAX_SLOT, MIN_SLOT};
use crate::error::{Error, Result};

/// Numbered storage location on the device (1..=99)
///
/// Each slot holds one image whose device-side name is derived from the
/// slot number.
///
/// # Examples
///
/// ```
/// use qrpos_core::SlotId;
///
/// let slot = SlotId::new(7).unwrap();
/// assert_eq!(slot.filename(), "7.jpeg");
/// assert!(SlotId::new(0).is_err());
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(u8);

impl SlotId {
    /// Validate a raw slot number
    pub fn new(slot: u32) -> Result<Self> {
        if !(MIN_SLOT..=MAX_SLOT).contains(&slot) {
            return Err(Error::SlotOutOfRange {
                slot,
                min: MIN_SLOT,
                max: MAX_SLOT,
            });
        }

        Ok(Self(slot as u8))
    }

    /// Raw slot number
    pub fn get(self) -> u32 {
        u32::from(self.0)
    }

    /// Device-side filename, e.g. `"12.jpeg"`
    pub fn filename(self) -> String {
        format!("{}.{}", self.0, IMAGE_EXTENSION)
    }

    /// Iterate over every valid slot in ascending order
    pub fn all() -> impl Iterator<Item = SlotId> {
        (MIN_SLOT..=MAX_SLOT).map(|n| Self(n as u8))
    }
}

impl TryFrom<u32> for SlotId {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<SlotId> for u32 {
    fn from(slot: SlotId) -> u32 {
        slot.get()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}
