//! Receive path: matches observed frames against queued expectations

use crate::bus::StreamSink;
use crate::types::Frame;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(feature = "logging")]
use crate::model::{diff_markers, hexify};
#[cfg(feature = "logging")]
use tracing::{debug, error};

/// FIFO of frames the module has yet to produce
///
/// The driver appends at the tail and the scoreboard pops the head. The
/// module is assumed not to reorder frames, so the head always pairs with the
/// next arrival.
#[derive(Debug, Clone, Default)]
pub struct ExpectationQueue {
    inner: Arc<Mutex<VecDeque<Frame>>>,
}

impl ExpectationQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an expectation at the tail
    pub fn push(&self, frame: Frame) {
        self.lock().push_back(frame);
    }

    /// Remove the oldest expectation
    pub fn pop(&self) -> Option<Frame> {
        self.lock().pop_front()
    }

    /// Expectations still outstanding
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is outstanding
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Frame>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Run counters, each with a single writer
///
/// `sent` belongs to the driver; `received`, `errors` and `unexpected` belong
/// to the scoreboard. Everyone else only reads.
#[derive(Debug, Default)]
pub struct Tally {
    sent: AtomicU64,
    received: AtomicU64,
    errors: AtomicU64,
    unexpected: AtomicU64,
}

impl Tally {
    /// Fresh zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_unexpected(&self) {
        self.unexpected.fetch_add(1, Ordering::Relaxed);
        self.record_error();
    }

    /// Copy of the counters at this instant
    pub fn snapshot(&self) -> Counters {
        Counters {
            sent: self.sent.load(Ordering::Relaxed),
            received: self.received.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            unexpected: self.unexpected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Frames fully transmitted by the driver
    pub sent: u64,

    /// Frames observed on the output
    pub received: u64,

    /// Frames that failed comparison, including unexpected ones
    pub errors: u64,

    /// Frames that arrived with nothing queued to compare against
    pub unexpected: u64,
}

/// Result of checking one received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Byte-for-byte equal to the queue head
    Match,
    /// Differs from the queue head
    Mismatch,
    /// The expectation queue was empty
    Unexpected,
}

/// Compares arrivals with the expectation queue and keeps score
#[derive(Debug, Clone)]
pub struct Scorer {
    expectations: ExpectationQueue,
    tally: Arc<Tally>,
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    debug: bool,
}

impl Scorer {
    /// Create a scorer consuming `expectations` and updating `tally`
    pub fn new(expectations: ExpectationQueue, tally: Arc<Tally>) -> Self {
        Self {
            expectations,
            tally,
            debug: false,
        }
    }

    /// Log every correctly received frame
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Score one received frame
    ///
    /// Mismatches are recorded and logged, never raised; the run carries on
    /// and the final evaluation turns the counters into a verdict.
    pub fn check(&self, received: &[u8]) -> Outcome {
        self.tally.record_received();

        let Some(expected) = self.expectations.pop() else {
            self.tally.record_unexpected();

            #[cfg(feature = "logging")]
            {
                error!("Unexpected {}B packet, nothing was sent", received.len());
                error!("Rx : {}", hexify(received));
            }

            return Outcome::Unexpected;
        };

        if expected.as_ref() != received {
            self.tally.record_error();

            #[cfg(feature = "logging")]
            {
                error!("Exp: {}", hexify(&expected));
                error!("Rx : {}", hexify(received));
                error!("Err: {}", diff_markers(&expected, received));
            }

            return Outcome::Mismatch;
        }

        #[cfg(feature = "logging")]
        if self.debug {
            debug!("Correctly received {}B packet", received.len());
        }

        Outcome::Match
    }

    /// Shared counters
    pub fn tally(&self) -> &Arc<Tally> {
        &self.tally
    }
}

/// Monitor loop pulling frames off a [`StreamSink`]
pub struct Scoreboard<K> {
    sink: K,
    scorer: Scorer,
}

impl<K: StreamSink> Scoreboard<K> {
    /// Pair a sink with the scorer that judges its frames
    pub fn new(sink: K, scorer: Scorer) -> Self {
        Self { sink, scorer }
    }

    /// Score frames until cancelled
    ///
    /// Only returns early if the sink reports the bus closed.
    pub async fn run(mut self) {
        loop {
            match self.sink.receive().await {
                Ok(frame) => {
                    self.scorer.check(&frame);
                }
                Err(_e) => {
                    #[cfg(feature = "logging")]
                    debug!("Scoreboard stopped: {}", _e);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn scorer() -> Scorer {
        Scorer::new(ExpectationQueue::new(), Arc::new(Tally::new()))
    }

    #[test]
    fn test_match_in_order() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(b"first"));
        scorer.expectations.push(Bytes::from_static(b"second"));

        assert_eq!(scorer.check(b"first"), Outcome::Match);
        assert_eq!(scorer.check(b"second"), Outcome::Match);

        let counters = scorer.tally().snapshot();
        assert_eq!(counters.received, 2);
        assert_eq!(counters.errors, 0);
        assert!(scorer.expectations.is_empty());
    }

    #[test]
    fn test_mismatch_is_recorded_and_consumes_expectation() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(b"abc"));
        scorer.expectations.push(Bytes::from_static(b"def"));

        assert_eq!(scorer.check(b"abd"), Outcome::Mismatch);
        // The next arrival still lines up with the next expectation
        assert_eq!(scorer.check(b"def"), Outcome::Match);

        let counters = scorer.tally().snapshot();
        assert_eq!(counters.received, 2);
        assert_eq!(counters.errors, 1);
        assert_eq!(counters.unexpected, 0);
    }

    #[test]
    fn test_reordering_shows_as_mismatch() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(b"one"));
        scorer.expectations.push(Bytes::from_static(b"two"));

        assert_eq!(scorer.check(b"two"), Outcome::Mismatch);
        assert_eq!(scorer.check(b"one"), Outcome::Mismatch);
        assert_eq!(scorer.tally().snapshot().errors, 2);
    }

    #[test]
    fn test_empty_queue_is_unexpected() {
        let scorer = scorer();

        assert_eq!(scorer.check(b"spurious"), Outcome::Unexpected);

        let counters = scorer.tally().snapshot();
        assert_eq!(counters.received, 1);
        assert_eq!(counters.errors, 1);
        assert_eq!(counters.unexpected, 1);
    }

    #[cfg(feature = "logging")]
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    #[cfg(feature = "logging")]
    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[cfg(feature = "logging")]
    fn captured_logs(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_mismatch_logs_expected_received_and_markers() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(&[0x0A, 0x0B, 0x0C]));

        let logs = captured_logs(|| {
            scorer.check(&[0x0A, 0xFF, 0x0C, 0x0D]);
        });

        let lines: Vec<&str> = logs.lines().collect();
        assert_eq!(lines.len(), 3, "{logs}");
        assert!(lines.iter().all(|l| l.contains("ERROR")));
        assert!(lines[0].contains("Exp: 0A 0B 0C"));
        assert!(lines[1].contains("Rx : 0A FF 0C 0D"));
        assert!(lines[2].contains("Err:    ~~    ~~"));
    }

    #[cfg(feature = "logging")]
    #[test]
    fn test_match_logs_nothing_without_debug() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(b"ok"));

        let logs = captured_logs(|| {
            scorer.check(b"ok");
        });

        assert!(logs.is_empty(), "{logs}");
    }

    #[test]
    fn test_length_mismatch() {
        let scorer = scorer();
        scorer.expectations.push(Bytes::from_static(b"abcd"));

        assert_eq!(scorer.check(b"abc"), Outcome::Mismatch);
    }
}
