// Host-side walkthrough of the decoder against simulated bus traffic

use lcdbus_core::charset::{bank_for_text, encode_annunciators};
use lcdbus_core::test_utils::bus_simulator::{run, BusSimulator};
use lcdbus_core::test_utils::test_scenarios::{instrument_cycle, worked_example};
use lcdbus_core::{Annunciator, Command, DecoderConfig, FrameDecoder, FrameMailbox, FrameSink, VERSION};

fn main() {
    println!("🧪 LCD bus decoder v{} walkthrough", VERSION);

    // Scenario 1: worked example register contents
    demo_worked_example();

    // Scenario 2: a full instrument cycle with annunciators
    demo_instrument_cycle();

    // Scenario 3: interrupted payload and power loss
    demo_fault_handling();

    println!("✅ Walkthrough complete");
    println!();
    println!("📝 Run the test suites with: cargo test -p lcdbus-tests");
}

fn demo_worked_example() {
    println!("📟 Decoding the worked example...");
    let mut decoder = FrameDecoder::new(DecoderConfig::default());
    for frame in run(&mut decoder, worked_example().edges()) {
        println!("  [{}]", frame.render());
    }
}

fn demo_instrument_cycle() {
    println!("📟 Decoding an instrument refresh with annunciators...");
    let config = DecoderConfig::default();
    let bank = match bank_for_text(" +1.23456E+0", "            ", &config) {
        Some(bank) => bank,
        None => {
            println!("  ❌ Text not encodable");
            return;
        }
    };

    let mut flags = [false; 12];
    flags[Annunciator::Adrs.bit()] = true;
    flags[Annunciator::Smpl.bit()] = true;
    let sim = instrument_cycle(&bank, encode_annunciators(&flags));

    let mut decoder = FrameDecoder::new(config);
    let mut mailbox = FrameMailbox::new();
    for edge in sim.edges() {
        decoder.process_into(*edge, &mut mailbox);
    }

    if let Some((sequence, frame)) = mailbox.latest_with_sequence() {
        let names: Vec<&str> = frame.lit_annunciators().map(|a| a.name()).collect();
        println!("  #{} [{}] {}", sequence, frame.render(), names.join(" "));
    }
    println!("  📊 {:?}", decoder.stats());
}

fn demo_fault_handling() {
    println!("⚡ Interrupted payload and PWO gap...");
    let mut decoder = FrameDecoder::new(DecoderConfig::default());
    let mut sim = BusSimulator::new();
    sim.write(Command::SELECT_A, &[0x11, 0x22, 0x33])
        .power_gap(32, false)
        .command(Command::SELECT_B);
    run(&mut decoder, sim.edges());

    let stats = decoder.stats();
    println!(
        "  abandoned={} powered_down_edges={} pending={:?}",
        stats.abandoned_payloads,
        stats.powered_down_edges,
        decoder.snapshot().pending_target
    );

    // Mailbox always accepts, so nothing is ever dropped on this path
    let mut mailbox = FrameMailbox::new();
    let accepted = mailbox.publish(decoder.decode_now());
    println!("  decode_now accepted by mailbox: {}", accepted);
}
