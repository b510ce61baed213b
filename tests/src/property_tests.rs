//! Property-based tests for the decoder and character mapping

#[cfg(test)]
mod tests {
    use lcdbus_core::charset::{bank_for_text, byte_index, char_code, decode_frame, encode_char_code};
    use lcdbus_core::test_utils::bus_simulator::{run, BusSimulator};
    use lcdbus_core::{
        ClockEdgeEvent, Command, DecoderConfig, Digit, FrameDecoder, PayloadTarget, RegisterBank,
        BYTE_BITS, COMMAND_BITS, POST_COMMAND_SKIP,
    };
    use proptest::prelude::*;

    fn edge_strategy() -> impl Strategy<Value = ClockEdgeEvent> {
        (any::<bool>(), any::<bool>(), prop::bool::weighted(0.9)).prop_map(
            |(bit, sync_high, power_asserted)| ClockEdgeEvent { bit, sync_high, power_asserted },
        )
    }

    fn text_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::char::range(' ', '~').prop_filter("'?' has no code of its own", |c| *c != '?'),
            12,
        )
        .prop_map(|chars| chars.into_iter().collect())
    }

    fn marks_strategy() -> impl Strategy<Value = String> {
        prop::collection::vec(prop::sample::select(vec![' ', '.', ':', ',']), 12)
            .prop_map(|marks| marks.into_iter().collect())
    }

    fn bank_strategy() -> impl Strategy<Value = RegisterBank> {
        (any::<[u8; 6]>(), any::<[u8; 6]>(), any::<[u8; 6]>())
            .prop_map(|(a, b, c)| RegisterBank::from_registers(a, b, c))
    }

    #[test]
    fn test_every_command_value() {
        for raw in 0..1024u16 {
            let mut decoder = FrameDecoder::new(DecoderConfig::default());
            let mut sim = BusSimulator::new();
            sim.command(raw);
            run(&mut decoder, sim.edges());

            let expected = match raw {
                0x028 => Some((PayloadTarget::RegA, 6)),
                0x068 => Some((PayloadTarget::RegB, 6)),
                0x0A8 => Some((PayloadTarget::RegC, 6)),
                0x2F0 => Some((PayloadTarget::Annunciators, 2)),
                _ => None,
            };

            let pending = decoder.snapshot().pending_target;
            assert_eq!(pending.map(|t| (t, t.expected_len())), expected, "command {:#05x}", raw);
            assert_eq!(Command::from_raw(raw).raw(), raw);
        }
    }

    #[test]
    fn test_byte_index_and_code_roundtrip_every_digit() {
        for d in 1..=12 {
            let bi = byte_index(d).unwrap();
            assert!(bi <= 5);

            let digit = Digit::new(d).unwrap();
            for code in 0..0x80u8 {
                let mut bank = RegisterBank::new();
                encode_char_code(&mut bank, digit, code);
                assert_eq!(char_code(&bank, digit), code, "digit {} code {:#x}", d, code);
            }
        }
        assert_eq!(byte_index(0), None);
        assert_eq!(byte_index(13), None);
    }

    proptest! {
        #[test]
        fn prop_text_roundtrip(text in text_strategy(), marks in marks_strategy()) {
            let config = DecoderConfig::default();
            let bank = bank_for_text(&text, &marks, &config).unwrap();
            let frame = decode_frame(&bank, &[false; 12], &config);

            let text_out = frame.text();
            let marks_out = frame.punctuation_text();
            prop_assert_eq!(text_out.as_str(), text.as_str());
            prop_assert_eq!(marks_out.as_str(), marks.as_str());
        }

        #[test]
        fn prop_decode_is_idempotent(bank in bank_strategy(), flags in any::<[bool; 12]>()) {
            let config = DecoderConfig::default();
            let first = decode_frame(&bank, &flags, &config);
            let second = decode_frame(&bank, &flags, &config);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_bus_frame_matches_direct_decode(bank in bank_strategy()) {
            let config = DecoderConfig::default();
            let mut decoder = FrameDecoder::new(config);
            let mut sim = BusSimulator::new();
            sim.refresh(&bank);

            let frames = run(&mut decoder, sim.edges());
            prop_assert_eq!(frames.len(), 1);
            prop_assert_eq!(frames[0], decode_frame(&bank, &[false; 12], &config));
        }

        #[test]
        fn prop_abandoned_payload(k in 0usize..6, bytes in any::<[u8; 6]>()) {
            let mut decoder = FrameDecoder::new(DecoderConfig::default());
            let mut sim = BusSimulator::new();
            sim.write(Command::SELECT_B, &bytes[..k]).command(Command::SELECT_C);
            run(&mut decoder, sim.edges());

            let snapshot = decoder.snapshot();
            prop_assert_eq!(snapshot.payload_bytes_received, 0);
            prop_assert_eq!(snapshot.pending_target, Some(PayloadTarget::RegC));
            prop_assert_eq!(decoder.stats().abandoned_payloads, 1);
            prop_assert_eq!(&decoder.registers().b[..k], &bytes[..k]);
        }

        #[test]
        fn prop_power_gap_is_invisible(
            bank in bank_strategy(),
            at in 0usize..180,
            len in 1usize..100,
            sync_high in any::<bool>(),
        ) {
            let mut sim = BusSimulator::new();
            sim.refresh(&bank);
            let clean = sim.take();
            let at = at.min(clean.len());

            let mut gap = BusSimulator::new();
            gap.power_gap(len, sync_high);

            let mut gapped = clean[..at].to_vec();
            gapped.extend_from_slice(gap.edges());
            gapped.extend_from_slice(&clean[at..]);

            let mut a = FrameDecoder::new(DecoderConfig::default());
            let mut b = FrameDecoder::new(DecoderConfig::default());
            let frames_clean = run(&mut a, &clean);
            let frames_gapped = run(&mut b, &gapped);

            prop_assert_eq!(frames_clean, frames_gapped);
            prop_assert_eq!(a.registers(), b.registers());
            prop_assert_eq!(a.stats().ina_edges, b.stats().ina_edges);
            prop_assert_eq!(a.stats().isa_edges, b.stats().isa_edges);
            prop_assert_eq!(b.stats().powered_down_edges as usize, len);
        }

        #[test]
        fn prop_noise_keeps_state_in_bounds(edges in prop::collection::vec(edge_strategy(), 0..400)) {
            let mut decoder = FrameDecoder::new(DecoderConfig::default());
            for edge in edges {
                decoder.process(edge);

                let snapshot = decoder.snapshot();
                prop_assert!(snapshot.command_bits < COMMAND_BITS);
                prop_assert!(snapshot.byte_bits < BYTE_BITS);
                prop_assert!(snapshot.ina_skip <= POST_COMMAND_SKIP);
                if let Some(target) = snapshot.pending_target {
                    prop_assert!(snapshot.payload_bytes_received < target.expected_len());
                }
            }
        }

        #[test]
        fn prop_resync_after_noise(
            noise in prop::collection::vec(edge_strategy(), 0..300),
            bank in bank_strategy(),
        ) {
            let config = DecoderConfig::default();
            let mut decoder = FrameDecoder::new(config);
            for edge in noise {
                decoder.process(edge);
            }
            // A data-phase edge guarantees the next command starts on a SYNC rise
            decoder.process(ClockEdgeEvent::data(false));

            let mut sim = BusSimulator::new();
            sim.refresh(&bank);
            let frames = run(&mut decoder, sim.edges());

            prop_assert_eq!(frames.len(), 1);
            let expected = decode_frame(&bank, &decoder.annunciators(), &config);
            prop_assert_eq!(frames[0], expected);
        }
    }
}
