//! Bit-level state machine for the LCD driver bus
//!
//! Runs once per rising O2 edge from interrupt context. Nothing here blocks
//! or allocates, and malformed traffic is absorbed into `DecoderStats`
//! rather than reported as an error.

use crate::charset::{decode_annunciators, decode_frame};
use crate::hal::FrameSink;
use crate::registers::RegisterBank;
use crate::types::{
    ClockEdgeEvent, Command, DecoderConfig, DecoderSnapshot, DecoderStats, DisplayFrame,
    PayloadTarget, Phase, ANNUNCIATOR_COUNT,
};

/// Bits in a command word
pub const COMMAND_BITS: u8 = 10;

/// Bits in a payload byte
pub const BYTE_BITS: u8 = 8;

/// INA clocks that carry no data after every command
pub const POST_COMMAND_SKIP: u8 = 2;

/// What a single edge did to the decoder
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EdgeOutcome {
    /// PWO deasserted, edge ignored
    PoweredDown,
    /// Command bit accumulated
    CommandBit,
    /// Tenth command bit received
    Command(Command),
    /// Post-command dead clock consumed
    Skipped,
    /// Payload bit accumulated
    PayloadBit,
    /// Byte stored into a register, payload still incomplete
    RegisterByte { target: PayloadTarget, index: usize, value: u8 },
    /// Register A or B payload finished
    PayloadComplete(PayloadTarget),
    /// Annunciator payload finished
    AnnunciatorsUpdated([bool; ANNUNCIATOR_COUNT]),
    /// Register C finished, new frame decoded
    FrameComplete(DisplayFrame),
    /// Byte assembled while no payload was armed
    OrphanByte(u8),
}

/// LSB-first shift accumulator
#[derive(Copy, Clone, Debug, Default)]
struct BitAccumulator {
    value: u16,
    count: u8,
}

impl BitAccumulator {
    const fn new() -> Self {
        Self { value: 0, count: 0 }
    }

    /// Shift in one bit; returns the word once `width` bits are collected
    fn push(&mut self, bit: bool, width: u8) -> Option<u16> {
        if bit {
            self.value |= 1 << self.count;
        }
        self.count += 1;
        if self.count >= width {
            let word = self.value;
            self.reset();
            Some(word)
        } else {
            None
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Main decoder context
///
/// Owns every accumulator, the register bank and the staged annunciator
/// state. Construct one per bus and call [`FrameDecoder::process`] from
/// the O2 edge handler.
pub struct FrameDecoder {
    phase: Phase,
    last_sync: Option<bool>,
    command: BitAccumulator,
    byte: BitAccumulator,
    pending_target: Option<PayloadTarget>,
    payload_bytes_received: usize,
    ina_skip: u8,
    bank: RegisterBank,
    annunciators: [bool; ANNUNCIATOR_COUNT],
    stats: DecoderStats,
    config: DecoderConfig,
}

impl FrameDecoder {
    /// Create new decoder with given configuration
    pub const fn new(config: DecoderConfig) -> Self {
        Self {
            phase: Phase::Ina,
            last_sync: None,
            command: BitAccumulator::new(),
            byte: BitAccumulator::new(),
            pending_target: None,
            payload_bytes_received: 0,
            ina_skip: 0,
            bank: RegisterBank::new(),
            annunciators: [false; ANNUNCIATOR_COUNT],
            stats: DecoderStats {
                isa_edges: 0,
                ina_edges: 0,
                powered_down_edges: 0,
                sync_transitions: 0,
                commands: 0,
                other_commands: 0,
                abandoned_payloads: 0,
                skipped_clocks: 0,
                register_bytes: 0,
                orphan_bytes: 0,
                annunciator_updates: 0,
                frames: 0,
                dropped_frames: 0,
            },
            config,
        }
    }

    /// Feed one clock edge
    pub fn process(&mut self, edge: ClockEdgeEvent) -> EdgeOutcome {
        if !edge.power_asserted {
            self.stats.powered_down_edges = self.stats.powered_down_edges.wrapping_add(1);
            return EdgeOutcome::PoweredDown;
        }

        if self.last_sync != Some(edge.sync_high) {
            self.handle_sync_change(edge.sync_high);
        }

        if edge.sync_high {
            self.handle_isa_bit(edge.bit)
        } else {
            self.handle_ina_bit(edge.bit)
        }
    }

    /// Feed one clock edge and hand any completed frame to `sink`
    pub fn process_into<S: FrameSink>(&mut self, edge: ClockEdgeEvent, sink: &mut S) -> EdgeOutcome {
        let outcome = self.process(edge);
        if let EdgeOutcome::FrameComplete(frame) = outcome {
            if !sink.publish(frame) {
                self.stats.dropped_frames = self.stats.dropped_frames.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::warn!("Frame sink full, frame dropped");
            }
        }
        outcome
    }

    /// SYNC moved: restart bit framing for the new phase
    fn handle_sync_change(&mut self, sync_high: bool) {
        if self.last_sync.is_some() {
            self.stats.sync_transitions = self.stats.sync_transitions.wrapping_add(1);
        }
        self.last_sync = Some(sync_high);
        self.command.reset();
        self.byte.reset();

        if sync_high {
            self.phase = Phase::Isa;
            self.ina_skip = 0;
        } else {
            self.phase = Phase::Ina;
            self.ina_skip = POST_COMMAND_SKIP;
        }
    }

    /// Handle one command-phase bit
    fn handle_isa_bit(&mut self, bit: bool) -> EdgeOutcome {
        self.stats.isa_edges = self.stats.isa_edges.wrapping_add(1);

        match self.command.push(bit, COMMAND_BITS) {
            Some(raw) => {
                let command = Command::from_raw(raw);
                self.accept_command(command);
                EdgeOutcome::Command(command)
            }
            None => EdgeOutcome::CommandBit,
        }
    }

    /// Arm the payload for a freshly received command
    fn accept_command(&mut self, command: Command) {
        self.stats.commands = self.stats.commands.wrapping_add(1);

        if let Some(_abandoned) = self.pending_target.take() {
            self.stats.abandoned_payloads = self.stats.abandoned_payloads.wrapping_add(1);
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Payload {:?} abandoned after {} bytes",
                _abandoned,
                self.payload_bytes_received
            );
        }

        self.payload_bytes_received = 0;
        self.pending_target = command.target();

        if self.pending_target.is_none() {
            self.stats.other_commands = self.stats.other_commands.wrapping_add(1);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("Command {:?} ({:#x})", command, command.raw());
    }

    /// Handle one data-phase bit
    fn handle_ina_bit(&mut self, bit: bool) -> EdgeOutcome {
        self.stats.ina_edges = self.stats.ina_edges.wrapping_add(1);

        if self.ina_skip > 0 {
            self.ina_skip -= 1;
            self.stats.skipped_clocks = self.stats.skipped_clocks.wrapping_add(1);
            return EdgeOutcome::Skipped;
        }

        match self.byte.push(bit, BYTE_BITS) {
            Some(word) => self.accept_byte(word as u8),
            None => EdgeOutcome::PayloadBit,
        }
    }

    /// Store a completed payload byte
    fn accept_byte(&mut self, value: u8) -> EdgeOutcome {
        let target = match self.pending_target {
            Some(target) => target,
            None => {
                self.stats.orphan_bytes = self.stats.orphan_bytes.wrapping_add(1);
                return EdgeOutcome::OrphanByte(value);
            }
        };

        let index = self.payload_bytes_received;
        if !self.bank.store(target, index, value) {
            // Counter ran past the register; treat as no payload armed
            self.pending_target = None;
            self.stats.orphan_bytes = self.stats.orphan_bytes.wrapping_add(1);
            return EdgeOutcome::OrphanByte(value);
        }
        self.stats.register_bytes = self.stats.register_bytes.wrapping_add(1);
        self.payload_bytes_received += 1;

        if self.payload_bytes_received < target.expected_len() {
            return EdgeOutcome::RegisterByte { target, index, value };
        }

        self.pending_target = None;
        self.complete_payload(target)
    }

    /// A register or the annunciator pair has been fully written
    fn complete_payload(&mut self, target: PayloadTarget) -> EdgeOutcome {
        match target {
            PayloadTarget::RegC => {
                let frame = decode_frame(&self.bank, &self.annunciators, &self.config);
                self.stats.frames = self.stats.frames.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::debug!("Frame {}: {:?}", self.stats.frames, frame.chars);
                EdgeOutcome::FrameComplete(frame)
            }
            PayloadTarget::Annunciators => {
                self.annunciators = decode_annunciators(self.bank.ann);
                self.stats.annunciator_updates = self.stats.annunciator_updates.wrapping_add(1);
                #[cfg(feature = "defmt")]
                defmt::trace!("Annunciators {:#x}", self.bank.annunciator_word());
                EdgeOutcome::AnnunciatorsUpdated(self.annunciators)
            }
            PayloadTarget::RegA | PayloadTarget::RegB => EdgeOutcome::PayloadComplete(target),
        }
    }

    /// Decode a frame from the current registers without waiting for RegC
    pub fn decode_now(&self) -> DisplayFrame {
        decode_frame(&self.bank, &self.annunciators, &self.config)
    }

    /// Diagnostic counters
    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// In-flight framing state
    pub fn snapshot(&self) -> DecoderSnapshot {
        DecoderSnapshot {
            phase: self.phase,
            pending_target: self.pending_target,
            payload_bytes_received: self.payload_bytes_received,
            command_bits: self.command.count,
            byte_bits: self.byte.count,
            ina_skip: self.ina_skip,
        }
    }

    /// Current register contents
    pub fn registers(&self) -> &RegisterBank {
        &self.bank
    }

    /// Annunciator state staged for the next frame
    pub fn annunciators(&self) -> [bool; ANNUNCIATOR_COUNT] {
        self.annunciators
    }

    /// Get current configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Update configuration, takes effect on the next frame
    pub fn set_config(&mut self, config: DecoderConfig) {
        self.config = config;
    }

    /// Return to power-on state, keeping the counters
    pub fn reset(&mut self) {
        let stats = self.stats;
        *self = Self::new(self.config);
        self.stats = stats;
    }

    /// Zero the diagnostic counters
    pub fn clear_stats(&mut self) {
        self.stats = DecoderStats::default();
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(crate::default_config())
    }
}
