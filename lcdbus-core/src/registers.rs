//! Shift-register snapshot filled by the frame decoder

use crate::types::{PayloadTarget, ANNUNCIATOR_LEN, REGISTER_LEN};

/// The three digit registers and the annunciator pair
///
/// Bytes are overwritten in place as they arrive. A payload cut short by a
/// new command leaves its partial bytes behind until the next complete
/// write to the same register.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterBank {
    pub a: [u8; REGISTER_LEN],
    pub b: [u8; REGISTER_LEN],
    pub c: [u8; REGISTER_LEN],
    pub ann: [u8; ANNUNCIATOR_LEN],
}

impl RegisterBank {
    pub const fn new() -> Self {
        Self {
            a: [0; REGISTER_LEN],
            b: [0; REGISTER_LEN],
            c: [0; REGISTER_LEN],
            ann: [0; ANNUNCIATOR_LEN],
        }
    }

    /// Build a bank from already assembled registers
    pub const fn from_registers(
        a: [u8; REGISTER_LEN],
        b: [u8; REGISTER_LEN],
        c: [u8; REGISTER_LEN],
    ) -> Self {
        Self { a, b, c, ann: [0; ANNUNCIATOR_LEN] }
    }

    /// Bytes of the register selected by `target`
    pub fn register(&self, target: PayloadTarget) -> &[u8] {
        match target {
            PayloadTarget::RegA => &self.a,
            PayloadTarget::RegB => &self.b,
            PayloadTarget::RegC => &self.c,
            PayloadTarget::Annunciators => &self.ann,
        }
    }

    fn register_mut(&mut self, target: PayloadTarget) -> &mut [u8] {
        match target {
            PayloadTarget::RegA => &mut self.a,
            PayloadTarget::RegB => &mut self.b,
            PayloadTarget::RegC => &mut self.c,
            PayloadTarget::Annunciators => &mut self.ann,
        }
    }

    /// Store one payload byte
    ///
    /// Returns false if `index` is outside the target register, in which
    /// case nothing is written.
    pub fn store(&mut self, target: PayloadTarget, index: usize, value: u8) -> bool {
        match self.register_mut(target).get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Annunciator payload as a little-endian word
    pub const fn annunciator_word(&self) -> u16 {
        u16::from_le_bytes(self.ann)
    }

    /// Zero every register
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
