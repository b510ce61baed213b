//! Core data types for the LCD bus decoder

use heapless::String;

/// Number of character cells on the display
pub const DIGIT_COUNT: usize = 12;

/// Number of annunciator flags
pub const ANNUNCIATOR_COUNT: usize = 12;

/// Bytes per digit register (A, B and C)
pub const REGISTER_LEN: usize = 6;

/// Bytes in the annunciator payload
pub const ANNUNCIATOR_LEN: usize = 2;

/// One sample taken on a rising O2 clock edge
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockEdgeEvent {
    /// ISA while SYNC is high, INA while SYNC is low
    pub bit: bool,
    /// SYNC line level (true = command phase)
    pub sync_high: bool,
    /// PWO line asserted
    pub power_asserted: bool,
}

impl ClockEdgeEvent {
    /// Command-phase edge carrying one ISA bit
    pub const fn command(bit: bool) -> Self {
        Self { bit, sync_high: true, power_asserted: true }
    }

    /// Data-phase edge carrying one INA bit
    pub const fn data(bit: bool) -> Self {
        Self { bit, sync_high: false, power_asserted: true }
    }

    /// Edge seen while PWO is deasserted
    pub const fn powered_down(bit: bool, sync_high: bool) -> Self {
        Self { bit, sync_high, power_asserted: false }
    }
}

/// Bus phase, selected by the SYNC line
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// SYNC high, commands on ISA
    Isa,
    /// SYNC low, payload on INA
    Ina,
}

/// Register addressed by a payload command
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Hash))]
pub enum PayloadTarget {
    RegA,
    RegB,
    RegC,
    Annunciators,
}

impl PayloadTarget {
    /// Number of payload bytes that follow the selecting command
    pub const fn expected_len(&self) -> usize {
        match self {
            PayloadTarget::RegA | PayloadTarget::RegB | PayloadTarget::RegC => REGISTER_LEN,
            PayloadTarget::Annunciators => ANNUNCIATOR_LEN,
        }
    }

    /// Returns true if completing this target finishes a display frame
    pub const fn completes_frame(&self) -> bool {
        matches!(self, PayloadTarget::RegC)
    }
}

/// A 10-bit command word received on ISA
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// 0x028
    SelectA,
    /// 0x068
    SelectB,
    /// 0x0A8
    SelectC,
    /// 0x2F0
    Annunciators,
    /// 0x3F0
    DisplaySelect,
    /// 0x320
    DisplayOnOff,
    /// Anything else
    Other(u16),
}

impl Command {
    pub const SELECT_A: u16 = 0x028;
    pub const SELECT_B: u16 = 0x068;
    pub const SELECT_C: u16 = 0x0A8;
    pub const ANNUNCIATORS: u16 = 0x2F0;
    pub const DISPLAY_SELECT: u16 = 0x3F0;
    pub const DISPLAY_ON_OFF: u16 = 0x320;

    /// Mask for the 10 command bits
    pub const MASK: u16 = 0x3FF;

    /// Classify a raw command value; bits above bit 9 are ignored
    pub const fn from_raw(raw: u16) -> Self {
        match raw & Self::MASK {
            Self::SELECT_A => Command::SelectA,
            Self::SELECT_B => Command::SelectB,
            Self::SELECT_C => Command::SelectC,
            Self::ANNUNCIATORS => Command::Annunciators,
            Self::DISPLAY_SELECT => Command::DisplaySelect,
            Self::DISPLAY_ON_OFF => Command::DisplayOnOff,
            other => Command::Other(other),
        }
    }

    /// Raw 10-bit value
    pub const fn raw(&self) -> u16 {
        match self {
            Command::SelectA => Self::SELECT_A,
            Command::SelectB => Self::SELECT_B,
            Command::SelectC => Self::SELECT_C,
            Command::Annunciators => Self::ANNUNCIATORS,
            Command::DisplaySelect => Self::DISPLAY_SELECT,
            Command::DisplayOnOff => Self::DISPLAY_ON_OFF,
            Command::Other(raw) => *raw & Self::MASK,
        }
    }

    /// Payload armed by this command, if any
    pub const fn target(&self) -> Option<PayloadTarget> {
        match self {
            Command::SelectA => Some(PayloadTarget::RegA),
            Command::SelectB => Some(PayloadTarget::RegB),
            Command::SelectC => Some(PayloadTarget::RegC),
            Command::Annunciators => Some(PayloadTarget::Annunciators),
            Command::DisplaySelect | Command::DisplayOnOff | Command::Other(_) => None,
        }
    }
}

/// Punctuation mark attached to a digit
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Punctuation {
    #[default]
    None,
    Period,
    Colon,
    Comma,
}

impl Punctuation {
    /// Decode the 2-bit field from register B
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Punctuation::None,
            1 => Punctuation::Period,
            2 => Punctuation::Colon,
            _ => Punctuation::Comma,
        }
    }

    pub const fn bits(&self) -> u8 {
        match self {
            Punctuation::None => 0,
            Punctuation::Period => 1,
            Punctuation::Colon => 2,
            Punctuation::Comma => 3,
        }
    }

    /// Glyph, space when there is no mark
    pub const fn as_char(&self) -> char {
        match self {
            Punctuation::None => ' ',
            Punctuation::Period => '.',
            Punctuation::Colon => ':',
            Punctuation::Comma => ',',
        }
    }

    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            ' ' => Some(Punctuation::None),
            '.' => Some(Punctuation::Period),
            ':' => Some(Punctuation::Colon),
            ',' => Some(Punctuation::Comma),
            _ => None,
        }
    }
}

/// Named annunciator flags, in bit order of the annunciator payload
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "std", derive(Hash))]
pub enum Annunciator {
    Shift,
    Err,
    Rear,
    Math,
    Mrng,
    Azoff,
    FourWire,
    AcDc,
    Adrs,
    Srq,
    Rem,
    Smpl,
}

impl Annunciator {
    /// Position table, index = payload bit
    pub const ALL: [Annunciator; ANNUNCIATOR_COUNT] = [
        Annunciator::Shift,
        Annunciator::Err,
        Annunciator::Rear,
        Annunciator::Math,
        Annunciator::Mrng,
        Annunciator::Azoff,
        Annunciator::FourWire,
        Annunciator::AcDc,
        Annunciator::Adrs,
        Annunciator::Srq,
        Annunciator::Rem,
        Annunciator::Smpl,
    ];

    /// 1-based display position
    pub const fn position(&self) -> usize {
        self.bit() + 1
    }

    /// Bit index inside the little-endian annunciator word
    pub const fn bit(&self) -> usize {
        *self as usize
    }

    pub const fn from_position(position: usize) -> Option<Self> {
        if position == 0 || position > ANNUNCIATOR_COUNT {
            None
        } else {
            Some(Self::ALL[position - 1])
        }
    }

    /// Legend shown on the instrument
    pub const fn name(&self) -> &'static str {
        match self {
            Annunciator::Shift => "SHIFT",
            Annunciator::Err => "ERR",
            Annunciator::Rear => "REAR",
            Annunciator::Math => "MATH",
            Annunciator::Mrng => "MRNG",
            Annunciator::Azoff => "AZOFF",
            Annunciator::FourWire => "4W",
            Annunciator::AcDc => "AC+DC",
            Annunciator::Adrs => "ADRS",
            Annunciator::Srq => "SRQ",
            Annunciator::Rem => "REM",
            Annunciator::Smpl => "SMPL",
        }
    }
}

/// One fully decoded display refresh
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayFrame {
    /// Digits 1..=12, left to right
    pub chars: [char; DIGIT_COUNT],
    /// Mark following each digit
    pub punctuation: [Punctuation; DIGIT_COUNT],
    /// Flag state, index = position - 1
    pub annunciators: [bool; ANNUNCIATOR_COUNT],
}

impl Default for DisplayFrame {
    fn default() -> Self {
        Self::blank()
    }
}

impl DisplayFrame {
    /// All spaces, no marks, no flags
    pub const fn blank() -> Self {
        Self {
            chars: [' '; DIGIT_COUNT],
            punctuation: [Punctuation::None; DIGIT_COUNT],
            annunciators: [false; ANNUNCIATOR_COUNT],
        }
    }

    /// The 12 characters without punctuation
    pub fn text(&self) -> String<DIGIT_COUNT> {
        let mut out = String::new();
        for &c in &self.chars {
            // Decoded chars are ASCII, one byte each
            let _ = out.push(c);
        }
        out
    }

    /// Punctuation as a 12 character string, space for no mark
    pub fn punctuation_text(&self) -> String<DIGIT_COUNT> {
        let mut out = String::new();
        for p in &self.punctuation {
            let _ = out.push(p.as_char());
        }
        out
    }

    /// Characters with each non-blank mark inserted after its digit
    pub fn render(&self) -> String<{ 2 * DIGIT_COUNT }> {
        let mut out = String::new();
        for (&c, p) in self.chars.iter().zip(self.punctuation.iter()) {
            let _ = out.push(c);
            if *p != Punctuation::None {
                let _ = out.push(p.as_char());
            }
        }
        out
    }

    /// Check a single annunciator
    pub const fn is_lit(&self, annunciator: Annunciator) -> bool {
        self.annunciators[annunciator.bit()]
    }

    /// Iterate over the annunciators that are on
    pub fn lit_annunciators(&self) -> impl Iterator<Item = Annunciator> + '_ {
        Annunciator::ALL
            .into_iter()
            .filter(move |a| self.annunciators[a.bit()])
    }
}

/// Diagnostic counters kept by the decoder
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderStats {
    /// Powered edges sampled while SYNC was high
    pub isa_edges: u32,
    /// Powered edges sampled while SYNC was low
    pub ina_edges: u32,
    /// Edges ignored because PWO was deasserted
    pub powered_down_edges: u32,
    /// SYNC level changes
    pub sync_transitions: u32,
    /// Complete 10-bit commands
    pub commands: u32,
    /// Commands that armed no payload
    pub other_commands: u32,
    /// Payloads cut short by a new command
    pub abandoned_payloads: u32,
    /// INA clocks dropped after a command
    pub skipped_clocks: u32,
    /// Register bytes stored
    pub register_bytes: u32,
    /// Bytes received with no payload armed
    pub orphan_bytes: u32,
    /// Annunciator payloads completed
    pub annunciator_updates: u32,
    /// Frames decoded on RegC completion
    pub frames: u32,
    /// Frames a sink refused
    pub dropped_frames: u32,
}

/// Read-only view of the decoder's in-flight state
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderSnapshot {
    pub phase: Phase,
    pub pending_target: Option<PayloadTarget>,
    pub payload_bytes_received: usize,
    pub command_bits: u8,
    pub byte_bits: u8,
    pub ina_skip: u8,
}

/// Decoder configuration parameters
///
/// Fields are only set through [`DecoderConfig::new`] or
/// [`DecoderConfig::DEFAULT`], so the fallback glyph is always one byte of
/// printable ASCII and the refresh period is never zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecoderConfig {
    question_as_equals: bool,
    recover_letters: bool,
    fallback: char,
    refresh_ms: u32,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl DecoderConfig {
    /// Instrument behaviour, 50 Hz presenter refresh
    pub const DEFAULT: Self = Self {
        question_as_equals: true,
        recover_letters: true,
        fallback: '?',
        refresh_ms: 20,
    };

    /// Create a new configuration with validation
    pub fn new(
        question_as_equals: bool,
        recover_letters: bool,
        fallback: char,
        refresh_ms: u32,
    ) -> Result<Self, &'static str> {
        if !(' '..='~').contains(&fallback) {
            return Err("Fallback glyph must be printable ASCII");
        }
        if !(5..=1000).contains(&refresh_ms) {
            return Err("Refresh must be between 5 and 1000ms");
        }

        Ok(Self {
            question_as_equals,
            recover_letters,
            fallback,
            refresh_ms,
        })
    }

    /// Show code 0x3F as '=' the way the instrument does
    pub const fn question_as_equals(&self) -> bool {
        self.question_as_equals
    }

    /// Recover letters sent without their 0x40 bit
    pub const fn recover_letters(&self) -> bool {
        self.recover_letters
    }

    /// Glyph for codes with no printable mapping
    pub const fn fallback(&self) -> char {
        self.fallback
    }

    /// Presenter refresh period in milliseconds
    pub const fn refresh_ms(&self) -> u32 {
        self.refresh_ms
    }

    /// Presenter refresh period
    #[cfg(feature = "embassy-time")]
    pub fn refresh_interval(&self) -> embassy_time::Duration {
        embassy_time::Duration::from_millis(self.refresh_ms as u64)
    }

    /// Display refresh rate in Hz
    pub fn refresh_hz(&self) -> u32 {
        (1000 / self.refresh_ms).max(1)
    }
}
