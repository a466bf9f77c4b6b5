//! Fuzz entry points for framecheck-core
//!
//! To use with cargo-fuzz:
//! 1. Install cargo-fuzz: cargo install cargo-fuzz
//! 2. Run fuzzer: cargo fuzz run fuzz_model

use framecheck_core::factory::{PauseOption, PayloadOption};
use framecheck_core::model::{compute_expected, diff_markers, hexify};
use framecheck_core::scoreboard::{ExpectationQueue, Scorer, Tally};
use framecheck_core::sim::Fault;
use framecheck_core::{EthConfig, MacAddr};
use std::sync::Arc;

fn split_config(data: &[u8]) -> Option<(EthConfig, &[u8])> {
    if data.len() < 14 {
        return None;
    }
    let mut dst = [0u8; 6];
    let mut src = [0u8; 6];
    dst.copy_from_slice(&data[0..6]);
    src.copy_from_slice(&data[6..12]);
    let ethertype = u16::from_be_bytes([data[12], data[13]]);
    Some((
        EthConfig::new(MacAddr::new(dst), MacAddr::new(src), ethertype),
        &data[14..],
    ))
}

/// First 14 bytes pick the header, the rest is the payload
pub fn fuzz_model(data: &[u8]) {
    let Some((config, payload)) = split_config(data) else {
        return;
    };

    let frame = compute_expected(payload, &config);
    assert_eq!(frame.len(), payload.len() + 14);
    assert_eq!(&frame[..14], &data[..14]);

    // Diagnostics must cope with any pair of lengths
    let _ = hexify(&frame);
    let _ = diff_markers(&frame, payload);
    let _ = diff_markers(payload, &frame);
}

/// Each input byte pair is (expected length, received length)
pub fn fuzz_scorer(data: &[u8]) {
    let queue = ExpectationQueue::new();
    let tally = Arc::new(Tally::new());
    let scorer = Scorer::new(queue.clone(), tally.clone());

    for pair in data.chunks(2) {
        if let Some(&exp) = pair.first() {
            if exp % 3 != 0 {
                queue.push(vec![exp; exp as usize].into());
            }
        }
        if let Some(&rx) = pair.get(1) {
            scorer.check(&vec![rx; rx as usize]);
        }
    }

    let counters = tally.snapshot();
    assert!(counters.errors <= counters.received);
    assert!(counters.unexpected <= counters.errors);
}

/// Option strings as they come in from the command line
pub fn fuzz_options(data: &[u8]) {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let _ = text.parse::<Fault>();
    let _ = text.parse::<MacAddr>();
    if let Ok(pause) = text.parse::<PauseOption>() {
        let _ = pause.build(Some(0));
    }
    if let Ok(payload) = text.parse::<PayloadOption>() {
        let _ = payload.build(Some(0));
    }
}
