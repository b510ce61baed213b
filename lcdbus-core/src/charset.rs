//! Register snapshot to display text
//!
//! Each register byte carries two digits: the low nibble belongs to the
//! even digit and the high nibble to the odd digit of the same pair. Digit
//! pairs are stored right to left, so digits 11 and 12 live in byte 0 and
//! digits 1 and 2 in byte 5.
//!
//! For digit `d` with lane shift `s` (0 for even, 4 for odd):
//!
//! | code bit | source |
//! |---|---|
//! | 6 | `c[bi]` bit `s` |
//! | 5 | `b[bi]` bit `s + 1` |
//! | 4 | `b[bi]` bit `s` |
//! | 3..0 | `a[bi]` bits `s + 3 ..= s` |
//!
//! and the punctuation mark is `b[bi]` bits `s + 3 ..= s + 2`.

use crate::registers::RegisterBank;
use crate::types::{
    DecoderConfig, DisplayFrame, Punctuation, ANNUNCIATOR_COUNT, ANNUNCIATOR_LEN, DIGIT_COUNT,
};

/// Code 0x3F ('?' in ASCII), which the instrument's character ROM shows as '='
const CODE_EQUALS_OVERRIDE: u8 = 0x3F;

/// A 1-based character cell number
#[derive(Copy, Clone, PartialEq, Eq, Debug, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Digit(u8);

impl Digit {
    pub const fn new(number: usize) -> Option<Self> {
        if number >= 1 && number <= DIGIT_COUNT {
            Some(Self(number as u8))
        } else {
            None
        }
    }

    /// Digit for a 0-based output slot
    pub const fn from_index(index: usize) -> Option<Self> {
        Self::new(index + 1)
    }

    /// Digits 1..=12 in reading order
    pub fn all() -> impl Iterator<Item = Digit> {
        (1..=DIGIT_COUNT as u8).map(Digit)
    }

    pub const fn number(&self) -> usize {
        self.0 as usize
    }

    /// Slot in `DisplayFrame::chars`
    pub const fn index(&self) -> usize {
        self.0 as usize - 1
    }

    pub const fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }

    /// Register byte holding this digit, always in `0..6`
    pub const fn byte_index(&self) -> usize {
        (DIGIT_COUNT - self.0 as usize) / 2
    }

    /// Bit offset of this digit's nibble lane
    pub const fn lane_shift(&self) -> u8 {
        if self.is_even() {
            0
        } else {
            4
        }
    }
}

/// Register byte index for digit number `d`, `None` outside 1..=12
pub const fn byte_index(d: usize) -> Option<usize> {
    match Digit::new(d) {
        Some(digit) => Some(digit.byte_index()),
        None => None,
    }
}

/// Extract the 7-bit character code of one digit
pub fn char_code(bank: &RegisterBank, digit: Digit) -> u8 {
    let bi = digit.byte_index();
    let s = digit.lane_shift();

    let bit6 = (bank.c[bi] >> s) & 1;
    let bit5 = (bank.b[bi] >> (s + 1)) & 1;
    let bit4 = (bank.b[bi] >> s) & 1;
    let low = (bank.a[bi] >> s) & 0x0F;

    (bit6 << 6) | (bit5 << 5) | (bit4 << 4) | low
}

/// Punctuation mark following one digit
pub fn punctuation(bank: &RegisterBank, digit: Digit) -> Punctuation {
    let bi = digit.byte_index();
    let s = digit.lane_shift();
    Punctuation::from_bits(bank.b[bi] >> (s + 2))
}

/// Map a character code to the glyph the instrument shows
pub fn code_to_char(code: u8, config: &DecoderConfig) -> char {
    let code = code & 0x7F;

    if code == CODE_EQUALS_OVERRIDE && config.question_as_equals() {
        return '=';
    }

    match code {
        0x20..=0x7E => code as char,
        0x00..=0x1F if config.recover_letters() => {
            let shifted = code | 0x40;
            if shifted.is_ascii_uppercase() {
                shifted as char
            } else {
                config.fallback()
            }
        }
        _ => config.fallback(),
    }
}

/// Annunciator flags from the two payload bytes
///
/// Bit k of the little-endian word is position k + 1. Bits 12..15 are
/// not wired to any legend.
pub fn decode_annunciators(ann: [u8; ANNUNCIATOR_LEN]) -> [bool; ANNUNCIATOR_COUNT] {
    let word = u16::from_le_bytes(ann);
    let mut flags = [false; ANNUNCIATOR_COUNT];
    for (k, flag) in flags.iter_mut().enumerate() {
        *flag = word & (1 << k) != 0;
    }
    flags
}

/// Decode a complete display frame
pub fn decode_frame(
    bank: &RegisterBank,
    annunciators: &[bool; ANNUNCIATOR_COUNT],
    config: &DecoderConfig,
) -> DisplayFrame {
    let mut frame = DisplayFrame::blank();
    for digit in Digit::all() {
        let i = digit.index();
        frame.chars[i] = code_to_char(char_code(bank, digit), config);
        frame.punctuation[i] = punctuation(bank, digit);
    }
    frame.annunciators = *annunciators;
    frame
}

#[cfg(any(test, feature = "test-utils"))]
pub use self::encode::*;

#[cfg(any(test, feature = "test-utils"))]
mod encode {
    //! Inverse mapping used to build synthetic register banks

    use super::*;

    /// Write a 7-bit code into the bits owned by `digit`
    ///
    /// Punctuation bits are left untouched.
    pub fn encode_char_code(bank: &mut RegisterBank, digit: Digit, code: u8) {
        let bi = digit.byte_index();
        let s = digit.lane_shift();

        bank.a[bi] = (bank.a[bi] & !(0x0F << s)) | ((code & 0x0F) << s);
        bank.b[bi] = (bank.b[bi] & !(0x03 << s)) | (((code >> 4) & 0x03) << s);
        bank.c[bi] = (bank.c[bi] & !(1 << s)) | (((code >> 6) & 1) << s);
    }

    /// Write the punctuation field owned by `digit`
    pub fn encode_punctuation(bank: &mut RegisterBank, digit: Digit, mark: Punctuation) {
        let bi = digit.byte_index();
        let shift = digit.lane_shift() + 2;
        bank.b[bi] = (bank.b[bi] & !(0x03 << shift)) | (mark.bits() << shift);
    }

    /// Annunciator payload bytes for a set of flags
    pub fn encode_annunciators(flags: &[bool; ANNUNCIATOR_COUNT]) -> [u8; ANNUNCIATOR_LEN] {
        let mut word = 0u16;
        for (k, &on) in flags.iter().enumerate() {
            if on {
                word |= 1 << k;
            }
        }
        word.to_le_bytes()
    }

    /// Code that decodes back to `c`, if there is one
    pub fn char_to_code(c: char, config: &DecoderConfig) -> Option<u8> {
        match c {
            '?' if config.question_as_equals() => None,
            ' '..='~' => Some(c as u8),
            _ => None,
        }
    }

    /// Build a bank that decodes to `text` with `marks`
    ///
    /// Both strings must be exactly 12 characters.
    pub fn bank_for_text(text: &str, marks: &str, config: &DecoderConfig) -> Option<RegisterBank> {
        if text.chars().count() != DIGIT_COUNT || marks.chars().count() != DIGIT_COUNT {
            return None;
        }

        let mut bank = RegisterBank::new();
        for ((digit, c), m) in Digit::all().zip(text.chars()).zip(marks.chars()) {
            encode_char_code(&mut bank, digit, char_to_code(c, config)?);
            encode_punctuation(&mut bank, digit, Punctuation::from_char(m)?);
        }
        Some(bank)
    }
}
