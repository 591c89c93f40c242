//! Encoding and decode-loop tests.

use phase_sequencer::encoding::{
    encode, position_phase, Alphabet, AlphabetKind, Corpus, ACTIVE_MAGNITUDE, RESIDUAL_MAGNITUDE,
};
use phase_sequencer::network::{Network, NetworkConfig};
use phase_sequencer::sequencer::{assemble, decode, DecodeConfig, OrderMode, SymbolRecord};
use std::f64::consts::PI;

// =========================================================================
// Helpers
// =========================================================================

fn assert_single_active(column: &[num_complex::Complex64], expected_slot: usize) {
    let active: Vec<usize> = column
        .iter()
        .enumerate()
        .filter(|(_, v)| (v.norm() - ACTIVE_MAGNITUDE).abs() < 1e-12)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(active, vec![expected_slot]);
    for (i, v) in column.iter().enumerate() {
        if i != expected_slot {
            assert!((v.norm() - RESIDUAL_MAGNITUDE).abs() < 1e-15, "slot {i} not residual");
        }
    }
}

fn toy_decode_config(seed: u8, order_mode: OrderMode) -> DecodeConfig {
    DecodeConfig { seed_symbol: seed, order_mode, ..DecodeConfig::default() }
}

// =========================================================================
// 1. Encoding
// =========================================================================

#[test]
fn every_corpus_column_has_one_active_slot() {
    let text = b"In the beginning";
    let alphabet = Alphabet::new(AlphabetKind::Bytes, 256, text).unwrap();
    let corpus = Corpus::build(text, &alphabet, 8, ACTIVE_MAGNITUDE).unwrap();
    let length = text.len();
    for i in 0..length {
        assert_single_active(&corpus.inputs.column_values(i), text[i] as usize);
        let j = (i + 8) % length;
        assert_single_active(&corpus.targets.column_values(i), text[j] as usize);
        let active = corpus.inputs.get(text[i] as usize, i);
        assert!((active.arg() - position_phase(i, length)).abs() < 1e-12);
    }
}

#[test]
fn phases_stay_below_pi() {
    for i in 0..10 {
        let phase = position_phase(i, 10);
        assert!((0.0..PI).contains(&phase));
    }
}

#[test]
fn unknown_symbol_is_an_error() {
    let alphabet = Alphabet::new(AlphabetKind::Bytes, 64, b"").unwrap();
    assert!(Corpus::build(b"z", &alphabet, 1, ACTIVE_MAGNITUDE).is_err());
    let e = encode(64, 10, 0.0, ACTIVE_MAGNITUDE);
    assert_single_active(&e, 10);
}

// =========================================================================
// 2. Decode loop
// =========================================================================

#[test]
fn decode_produces_length_plus_one_records() {
    let text = b"ABBA";
    let alphabet = Alphabet::new(AlphabetKind::Compact, 4, text).unwrap();
    let net = Network::new(NetworkConfig { width: 4, middle: 4, ..NetworkConfig::default() }, 1).unwrap();

    for mode in [OrderMode::Position, OrderMode::Phase, OrderMode::Snapped] {
        let decoded = decode(&net, &alphabet, text.len(), &toy_decode_config(b'A', mode)).unwrap();
        assert_eq!(decoded.records.len(), text.len() + 1);
        assert_eq!(decoded.sequenced.chars().count(), text.len() + 1);

        let seed = decoded.records[0];
        assert_eq!(seed.symbol, b'A');
        assert_eq!(seed.order, 0.0);
        assert!(seed.score.is_none());
        for r in &decoded.records[1..] {
            assert!(r.score.is_some());
            assert!(r.slot < 4);
            assert!(r.order >= 0.0 && r.order <= PI);
        }
        assert_eq!(decoded.sequenced, assemble(&decoded.records));
    }
}

#[test]
fn snapped_orders_lie_on_bucket_edges() {
    let text = b"ABCAB";
    let length = text.len();
    let alphabet = Alphabet::new(AlphabetKind::Compact, 3, text).unwrap();
    let net = Network::new(NetworkConfig { width: 3, middle: 5, ..NetworkConfig::default() }, 8).unwrap();
    let decoded = decode(&net, &alphabet, length, &toy_decode_config(b'C', OrderMode::Snapped)).unwrap();
    for (step, r) in decoded.records[1..].iter().enumerate() {
        let low = position_phase(step, length);
        let high = position_phase(step + 1, length);
        assert!(r.order == low || r.order == high, "step {step}: order {}", r.order);
    }
}

#[test]
fn position_orders_follow_decode_order() {
    let text = b"ABCAB";
    let length = text.len();
    let alphabet = Alphabet::new(AlphabetKind::Compact, 3, text).unwrap();
    let net = Network::new(NetworkConfig { width: 3, middle: 5, ..NetworkConfig::default() }, 8).unwrap();
    let decoded = decode(&net, &alphabet, length, &DecodeConfig { seed_symbol: b'C', ..DecodeConfig::default() }).unwrap();

    for (i, r) in decoded.records.iter().enumerate() {
        assert_eq!(r.order, position_phase(i, length), "record {i}");
    }
    let in_order: String = decoded.records.iter().map(|r| char::from(r.symbol)).collect();
    assert_eq!(decoded.sequenced, in_order);
    assert!(decoded.sequenced.starts_with('C'));
}

#[test]
fn order_mode_does_not_change_decoded_symbols() {
    let text = b"ABCAB";
    let alphabet = Alphabet::new(AlphabetKind::Compact, 3, text).unwrap();
    let net = Network::new(NetworkConfig { width: 3, middle: 5, ..NetworkConfig::default() }, 8).unwrap();
    let slots = |mode| -> Vec<usize> {
        let decoded = decode(&net, &alphabet, text.len(), &toy_decode_config(b'C', mode)).unwrap();
        decoded.records.iter().map(|r| r.slot).collect()
    };
    let by_position = slots(OrderMode::Position);
    assert_eq!(slots(OrderMode::Phase), by_position);
    assert_eq!(slots(OrderMode::Snapped), by_position);
}

#[test]
fn seed_outside_alphabet_rejected() {
    let alphabet = Alphabet::new(AlphabetKind::Compact, 4, b"AB").unwrap();
    let net = Network::new(NetworkConfig { width: 4, middle: 2, ..NetworkConfig::default() }, 1).unwrap();
    assert!(decode(&net, &alphabet, 2, &toy_decode_config(b'Z', OrderMode::Position)).is_err());
}

#[test]
fn width_mismatch_rejected() {
    let alphabet = Alphabet::new(AlphabetKind::Compact, 5, b"AB").unwrap();
    let net = Network::new(NetworkConfig { width: 4, middle: 2, ..NetworkConfig::default() }, 1).unwrap();
    assert!(decode(&net, &alphabet, 2, &toy_decode_config(b'A', OrderMode::Position)).is_err());
}

// =========================================================================
// 3. Assembly
// =========================================================================

#[test]
fn equal_orders_keep_insertion_order() {
    let records: Vec<SymbolRecord> = b"DCBA"
        .iter()
        .map(|&s| SymbolRecord { slot: 0, symbol: s, order: 1.0, score: Some(0.5) })
        .collect();
    assert_eq!(assemble(&records), "DCBA");
}

#[test]
fn duplicates_are_kept() {
    let records = vec![
        SymbolRecord { slot: 1, symbol: b'a', order: 0.2, score: None },
        SymbolRecord { slot: 1, symbol: b'a', order: 0.1, score: Some(1.0) },
    ];
    assert_eq!(assemble(&records), "aa");
}
