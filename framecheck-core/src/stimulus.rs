//! Payload and backpressure generators.
//!
//! Every generator is a plain [`Iterator`] that never ends. Reuse across runs
//! happens by constructing a fresh value; none of them share state. Seeded
//! random generators replay the same sequence for the same seed, unseeded ones
//! draw from OS entropy.

use crate::constants::CYCLE_PAUSE_PATTERN;
use crate::error::HarnessError;
use crate::types::Payload;
use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Per-cycle backpressure, `true` meaning the source stalls that cycle
pub type PauseStream = Box<dyn Iterator<Item = bool> + Send>;

/// Boxed payload generator handed to a harness run
pub type PayloadStream = Box<dyn Iterator<Item = Payload> + Send>;

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Payloads of growing length filled with a running byte counter.
///
/// Payload `n` (1-indexed) is `n` bytes long. The counter is never reset
/// within one generator, so payload `n` reads `1, 2, …, n` (mod 256): each
/// payload extends the previous one by the next counter value.
#[derive(Debug, Clone, Default)]
pub struct CounterPayloads {
    buf: BytesMut,
    counter: u64,
}

impl CounterPayloads {
    /// Start a fresh counter at 1
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for CounterPayloads {
    type Item = Payload;

    fn next(&mut self) -> Option<Payload> {
        self.counter += 1;
        self.buf.put_u8((self.counter % 256) as u8);
        Some(Bytes::copy_from_slice(&self.buf))
    }
}

/// Payloads of random length and content
#[derive(Debug, Clone)]
pub struct RandomPayloads {
    rng: StdRng,
    max_size: usize,
}

impl RandomPayloads {
    /// Lengths are drawn from `[1, max_size)`, so `max_size` must be at least 2
    pub fn new(max_size: usize, seed: Option<u64>) -> Result<Self, HarnessError> {
        if max_size < 2 {
            return Err(HarnessError::InvalidStimulus(format!(
                "max_size must be at least 2, got {max_size}"
            )));
        }

        Ok(Self {
            rng: make_rng(seed),
            max_size,
        })
    }

    /// Exclusive upper bound on payload length
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl Iterator for RandomPayloads {
    type Item = Payload;

    fn next(&mut self) -> Option<Payload> {
        let len = self.rng.gen_range(1..self.max_size);
        let mut payload = vec![0u8; len];
        self.rng.fill(payload.as_mut_slice());
        Some(Bytes::from(payload))
    }
}

/// Backpressure that is never asserted
pub fn no_pause() -> impl Iterator<Item = bool> + Send + Clone {
    std::iter::repeat(false)
}

/// Three ready cycles followed by one stalled cycle, forever
#[derive(Debug, Clone, Default)]
pub struct CyclePause {
    phase: usize,
}

impl CyclePause {
    /// Start at the first ready cycle
    pub fn new() -> Self {
        Self::default()
    }
}

impl Iterator for CyclePause {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        let paused = CYCLE_PAUSE_PATTERN[self.phase];
        self.phase = (self.phase + 1) % CYCLE_PAUSE_PATTERN.len();
        Some(paused)
    }
}

/// Each cycle independently stalled with probability `p`
#[derive(Debug, Clone)]
pub struct RandomPause {
    rng: StdRng,
    p: f64,
}

impl RandomPause {
    /// Create a pattern stalling with probability `p` in `[0, 1]`
    pub fn new(p: f64, seed: Option<u64>) -> Result<Self, HarnessError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(HarnessError::InvalidStimulus(format!(
                "pause probability must be within [0, 1], got {p}"
            )));
        }

        Ok(Self {
            rng: make_rng(seed),
            p,
        })
    }
}

impl Iterator for RandomPause {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        Some(self.rng.gen_bool(self.p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_PAUSE_PROBABILITY;

    #[test]
    fn test_counter_payloads_grow() {
        let payloads: Vec<_> = CounterPayloads::new().take(4).collect();

        assert_eq!(payloads[0].as_ref(), &[1]);
        assert_eq!(payloads[1].as_ref(), &[1, 2]);
        assert_eq!(payloads[2].as_ref(), &[1, 2, 3]);
        assert_eq!(payloads[3].as_ref(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_counter_payloads_wrap() {
        let payload = CounterPayloads::new().nth(299).unwrap();

        assert_eq!(payload.len(), 300);
        assert_eq!(payload[254], 255);
        assert_eq!(payload[255], 0);
        assert_eq!(payload[256], 1);
    }

    #[test]
    fn test_counter_payloads_fresh_instances_independent() {
        let mut a = CounterPayloads::new();
        a.nth(10);
        let mut b = CounterPayloads::new();
        assert_eq!(b.next().unwrap().as_ref(), &[1]);
    }

    #[test]
    fn test_random_payload_bounds() {
        let gen = RandomPayloads::new(8, Some(7)).unwrap();
        for payload in gen.take(500) {
            assert!(!payload.is_empty());
            assert!(payload.len() < 8);
        }
    }

    #[test]
    fn test_random_payload_smallest_range() {
        // max_size 2 leaves length 1 as the only choice
        let gen = RandomPayloads::new(2, Some(1)).unwrap();
        assert!(gen.take(50).all(|p| p.len() == 1));
    }

    #[test]
    fn test_random_payload_rejects_tiny_max() {
        assert!(matches!(
            RandomPayloads::new(1, None),
            Err(HarnessError::InvalidStimulus(_))
        ));
    }

    #[test]
    fn test_seeded_generators_replay() {
        let a: Vec<_> = RandomPayloads::new(64, Some(42)).unwrap().take(20).collect();
        let b: Vec<_> = RandomPayloads::new(64, Some(42)).unwrap().take(20).collect();
        assert_eq!(a, b);

        let p: Vec<_> = RandomPause::new(0.3, Some(9)).unwrap().take(100).collect();
        let q: Vec<_> = RandomPause::new(0.3, Some(9)).unwrap().take(100).collect();
        assert_eq!(p, q);
    }

    #[test]
    fn test_cycle_pause_pattern() {
        let pattern: Vec<_> = CyclePause::new().take(8).collect();
        assert_eq!(
            pattern,
            vec![false, false, false, true, false, false, false, true]
        );
    }

    #[test]
    fn test_no_pause() {
        assert!(no_pause().take(1000).all(|p| !p));
    }

    #[test]
    fn test_random_pause_extremes() {
        assert!(RandomPause::new(0.0, Some(3)).unwrap().take(100).all(|p| !p));
        assert!(RandomPause::new(1.0, Some(3)).unwrap().take(100).all(|p| p));
        assert!(RandomPause::new(1.5, None).is_err());
    }

    #[test]
    fn test_random_pause_default_probability() {
        let pattern = RandomPause::new(DEFAULT_PAUSE_PROBABILITY, Some(11)).unwrap();
        let stalls = pattern.take(10_000).filter(|p| *p).count();
        assert!((500..1500).contains(&stalls), "stalls = {stalls}");
    }
}
