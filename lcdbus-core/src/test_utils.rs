//! Test utilities for decoder functionality

#[cfg(feature = "test-utils")]
pub mod bus_simulator {
    //! Edge stream synthesis, the way the instrument drives the bus

    use crate::fsm::{EdgeOutcome, FrameDecoder, BYTE_BITS, COMMAND_BITS, POST_COMMAND_SKIP};
    use crate::registers::RegisterBank;
    use crate::types::{ClockEdgeEvent, Command, DisplayFrame, ANNUNCIATOR_COUNT};
    use crate::charset::encode_annunciators;

    /// Builder for a sequence of O2 edges
    #[derive(Debug, Clone, Default)]
    pub struct BusSimulator {
        edges: Vec<ClockEdgeEvent>,
        powered_off: bool,
    }

    impl BusSimulator {
        pub fn new() -> Self {
            Self::default()
        }

        fn edge(&mut self, bit: bool, sync_high: bool) {
            self.edges.push(ClockEdgeEvent {
                bit,
                sync_high,
                power_asserted: !self.powered_off,
            });
        }

        /// Ten ISA edges, LSB first
        pub fn command(&mut self, raw: u16) -> &mut Self {
            for i in 0..COMMAND_BITS {
                self.edge(raw & (1 << i) != 0, true);
            }
            self
        }

        /// Only the first `bits` edges of a command
        pub fn partial_command(&mut self, raw: u16, bits: u8) -> &mut Self {
            for i in 0..bits.min(COMMAND_BITS) {
                self.edge(raw & (1 << i) != 0, true);
            }
            self
        }

        /// Dead INA clocks following a command
        pub fn dead_clocks(&mut self) -> &mut Self {
            for _ in 0..POST_COMMAND_SKIP {
                self.edge(true, false);
            }
            self
        }

        /// INA bytes, LSB first, without the leading dead clocks
        pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
            for byte in bytes {
                for i in 0..BYTE_BITS {
                    self.edge(byte & (1 << i) != 0, false);
                }
            }
            self
        }

        /// Dead clocks followed by payload bytes
        pub fn payload(&mut self, bytes: &[u8]) -> &mut Self {
            self.dead_clocks().bytes(bytes)
        }

        /// Command and its payload
        pub fn write(&mut self, raw: u16, bytes: &[u8]) -> &mut Self {
            self.command(raw).payload(bytes)
        }

        /// Annunciator command with flags encoded
        pub fn annunciators(&mut self, flags: &[bool; ANNUNCIATOR_COUNT]) -> &mut Self {
            self.write(Command::ANNUNCIATORS, &encode_annunciators(flags))
        }

        /// One display refresh: registers A, B then C
        pub fn refresh(&mut self, bank: &RegisterBank) -> &mut Self {
            self.write(Command::SELECT_A, &bank.a)
                .write(Command::SELECT_B, &bank.b)
                .write(Command::SELECT_C, &bank.c)
        }

        /// Single INA bit, used to inject a glitch
        pub fn stray_bit(&mut self, bit: bool) -> &mut Self {
            self.edge(bit, false);
            self
        }

        /// `count` edges with PWO deasserted
        pub fn power_gap(&mut self, count: usize, sync_high: bool) -> &mut Self {
            let was_off = self.powered_off;
            self.powered_off = true;
            for i in 0..count {
                self.edge(i % 2 == 0, sync_high);
            }
            self.powered_off = was_off;
            self
        }

        pub fn edges(&self) -> &[ClockEdgeEvent] {
            &self.edges
        }

        pub fn len(&self) -> usize {
            self.edges.len()
        }

        pub fn is_empty(&self) -> bool {
            self.edges.is_empty()
        }

        /// Hand over the edges and start again
        pub fn take(&mut self) -> Vec<ClockEdgeEvent> {
            core::mem::take(&mut self.edges)
        }
    }

    /// Feed edges and collect every frame produced
    pub fn run(decoder: &mut FrameDecoder, edges: &[ClockEdgeEvent]) -> Vec<DisplayFrame> {
        let mut frames = Vec::new();
        for edge in edges {
            if let EdgeOutcome::FrameComplete(frame) = decoder.process(*edge) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Feed edges and collect every outcome
    pub fn trace(decoder: &mut FrameDecoder, edges: &[ClockEdgeEvent]) -> Vec<EdgeOutcome> {
        edges.iter().map(|edge| decoder.process(*edge)).collect()
    }
}

#[cfg(feature = "test-utils")]
pub mod test_scenarios {
    //! Common test scenarios

    use super::bus_simulator::BusSimulator;
    use crate::charset::bank_for_text;
    use crate::registers::RegisterBank;
    use crate::types::DecoderConfig;

    /// Register contents from the reverse-engineering notes
    pub fn worked_example_bank() -> RegisterBank {
        RegisterBank::from_registers(
            [0x1F, 0x99, 0x99, 0xD9, 0x50, 0x25],
            [0x31, 0x37, 0x33, 0x23, 0x0D, 0x00],
            [0x00; 6],
        )
    }

    /// Full refresh cycle carrying the worked example
    pub fn worked_example() -> BusSimulator {
        let mut sim = BusSimulator::new();
        sim.refresh(&worked_example_bank());
        sim
    }

    /// Refresh cycle that displays `text` with `marks`
    pub fn showing(text: &str, marks: &str) -> Option<BusSimulator> {
        let bank = bank_for_text(text, marks, &DecoderConfig::default())?;
        let mut sim = BusSimulator::new();
        sim.refresh(&bank);
        Some(sim)
    }

    /// Refresh cycle as the instrument sends it, with the display
    /// housekeeping commands around the register writes
    pub fn instrument_cycle(bank: &RegisterBank, annunciators: [u8; 2]) -> BusSimulator {
        let mut sim = BusSimulator::new();
        sim.command(crate::types::Command::DISPLAY_SELECT)
            .dead_clocks()
            .write(crate::types::Command::ANNUNCIATORS, &annunciators)
            .refresh(bank)
            .command(crate::types::Command::DISPLAY_ON_OFF)
            .dead_clocks();
        sim
    }
}
