//! Property-based tests using proptest

use framecheck_core::{
    compute_expected,
    constants::HEADER_WIDTH,
    model::{diff_markers, header_bytes, hexify},
    stimulus::{CounterPayloads, RandomPause, RandomPayloads},
    EthConfig, MacAddr,
};
use proptest::prelude::*;

fn any_config() -> impl Strategy<Value = EthConfig> {
    (any::<[u8; 6]>(), any::<[u8; 6]>(), any::<u16>())
        .prop_map(|(dst, src, ty)| EthConfig::new(MacAddr::new(dst), MacAddr::new(src), ty))
}

proptest! {
    #[test]
    fn prop_frame_is_header_then_payload(
        config in any_config(),
        payload in prop::collection::vec(any::<u8>(), 1..2048)
    ) {
        let frame = compute_expected(&payload, &config);

        prop_assert_eq!(frame.len(), HEADER_WIDTH + payload.len());
        prop_assert_eq!(&frame[..HEADER_WIDTH], &header_bytes(&config)[..]);
        prop_assert_eq!(&frame[HEADER_WIDTH..], &payload[..]);
    }

    #[test]
    fn prop_header_independent_of_payload(
        config in any_config(),
        a in prop::collection::vec(any::<u8>(), 1..256),
        b in prop::collection::vec(any::<u8>(), 1..256)
    ) {
        let fa = compute_expected(&a, &config);
        let fb = compute_expected(&b, &config);
        prop_assert_eq!(&fa[..HEADER_WIDTH], &fb[..HEADER_WIDTH]);
    }

    #[test]
    fn prop_seeded_payloads_replay(seed in any::<u64>(), max_size in 2usize..512) {
        let a: Vec<_> = RandomPayloads::new(max_size, Some(seed)).unwrap().take(16).collect();
        let b: Vec<_> = RandomPayloads::new(max_size, Some(seed)).unwrap().take(16).collect();
        prop_assert_eq!(&a, &b);
        prop_assert!(a.iter().all(|p| !p.is_empty() && p.len() < max_size));
    }

    #[test]
    fn prop_seeded_pause_replays(seed in any::<u64>(), p in 0.0f64..=1.0) {
        let a: Vec<_> = RandomPause::new(p, Some(seed)).unwrap().take(64).collect();
        let b: Vec<_> = RandomPause::new(p, Some(seed)).unwrap().take(64).collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_counter_payload_shape(n in 1usize..600) {
        let payload = CounterPayloads::new().nth(n - 1).unwrap();
        prop_assert_eq!(payload.len(), n);
        for (i, byte) in payload.iter().enumerate() {
            prop_assert_eq!(*byte, ((i + 1) % 256) as u8);
        }
    }

    #[test]
    fn prop_diff_aligns_with_hexify(
        expected in prop::collection::vec(any::<u8>(), 0..128),
        received in prop::collection::vec(any::<u8>(), 0..128)
    ) {
        let markers = diff_markers(&expected, &received);
        let longest = expected.len().max(received.len());
        prop_assert_eq!(markers.len(), hexify(&vec![0u8; longest]).len());

        if expected == received {
            prop_assert!(!markers.contains('~'));
        } else {
            prop_assert!(markers.contains('~'));
        }
    }
}
