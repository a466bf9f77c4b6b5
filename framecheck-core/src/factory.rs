//! Test-case expansion over stimulus and backpressure choices.
//!
//! Every pause option is crossed with every payload option. Each resulting
//! case builds its own bench, harness, generator and pause pattern, so no
//! state leaks from one case into the next.

use crate::bus::{Bench, DeviceUnderTest, StreamSink, StreamSource};
use crate::constants::{DEFAULT_ITEMS_PER_CASE, DEFAULT_MAX_PAYLOAD, DEFAULT_PAUSE_PROBABILITY};
use crate::error::HarnessError;
use crate::harness::{Harness, RunReport};
use crate::stimulus::{CounterPayloads, CyclePause, PauseStream, PayloadStream, RandomPause, RandomPayloads};
use crate::types::Timing;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "logging")]
use tracing::{error, info};

/// Backpressure applied to the input stream of a case
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseOption {
    /// Never stall
    None,
    /// Ready, ready, ready, stalled
    Cycle,
    /// Stall each cycle with probability `p`
    Random {
        /// Stall probability.
        p: f64,
    },
}

impl PauseOption {
    /// The three options of the standard matrix
    pub fn all() -> Vec<Self> {
        vec![
            PauseOption::None,
            PauseOption::Cycle,
            PauseOption::Random {
                p: DEFAULT_PAUSE_PROBABILITY,
            },
        ]
    }

    /// Build a fresh pattern; `None` leaves the source always ready
    pub fn build(&self, seed: Option<u64>) -> Result<Option<PauseStream>, HarnessError> {
        Ok(match self {
            PauseOption::None => None,
            PauseOption::Cycle => Some(Box::new(CyclePause::new())),
            PauseOption::Random { p } => Some(Box::new(RandomPause::new(*p, seed)?)),
        })
    }
}

impl fmt::Display for PauseOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PauseOption::None => f.write_str("none"),
            PauseOption::Cycle => f.write_str("cycle"),
            PauseOption::Random { p } => write!(f, "random:{p}"),
        }
    }
}

impl FromStr for PauseOption {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, arg) = split_option(s);
        match (kind, arg) {
            ("none", None) => Ok(PauseOption::None),
            ("cycle", None) => Ok(PauseOption::Cycle),
            ("random", None) => Ok(PauseOption::Random {
                p: DEFAULT_PAUSE_PROBABILITY,
            }),
            ("random", Some(p)) => p
                .parse()
                .map(|p| PauseOption::Random { p })
                .map_err(|_| HarnessError::InvalidStimulus(format!("Bad pause probability: {s}"))),
            _ => Err(HarnessError::InvalidStimulus(format!(
                "Unknown pause option: {s}"
            ))),
        }
    }
}

/// Payload generator driving a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadOption {
    /// Growing payloads of counter bytes
    Counter,
    /// Random length in `[1, max_size)`, random bytes
    Random {
        /// Exclusive upper bound on length.
        max_size: usize,
    },
}

impl PayloadOption {
    /// The two options of the standard matrix
    pub fn all() -> Vec<Self> {
        vec![
            PayloadOption::Counter,
            PayloadOption::Random {
                max_size: DEFAULT_MAX_PAYLOAD,
            },
        ]
    }

    /// Build a fresh generator
    pub fn build(&self, seed: Option<u64>) -> Result<PayloadStream, HarnessError> {
        Ok(match self {
            PayloadOption::Counter => Box::new(CounterPayloads::new()),
            PayloadOption::Random { max_size } => Box::new(RandomPayloads::new(*max_size, seed)?),
        })
    }
}

impl fmt::Display for PayloadOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadOption::Counter => f.write_str("counter"),
            PayloadOption::Random { max_size } => write!(f, "random:{max_size}"),
        }
    }
}

impl FromStr for PayloadOption {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match split_option(s) {
            ("counter", None) => Ok(PayloadOption::Counter),
            ("random", None) => Ok(PayloadOption::Random {
                max_size: DEFAULT_MAX_PAYLOAD,
            }),
            ("random", Some(n)) => n
                .parse()
                .map(|max_size| PayloadOption::Random { max_size })
                .map_err(|_| HarnessError::InvalidStimulus(format!("Bad payload size: {s}"))),
            _ => Err(HarnessError::InvalidStimulus(format!(
                "Unknown payload option: {s}"
            ))),
        }
    }
}

fn split_option(s: &str) -> (&str, Option<&str>) {
    match s.split_once(':') {
        Some((kind, arg)) => (kind, Some(arg)),
        None => (s, None),
    }
}

/// One point of the option matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Position in the expansion, starting at 1
    pub index: usize,

    /// Backpressure choice
    pub pause: PauseOption,

    /// Payload generator choice
    pub payload: PayloadOption,

    /// Payloads driven
    pub items: usize,

    /// Seed for this case's random generators, `None` for entropy
    pub seed: Option<u64>,
}

impl TestCase {
    /// Stable case name, e.g. `run_test_004`
    pub fn name(&self) -> String {
        format!("run_test_{:03}", self.index)
    }

    /// Drive this case on a freshly built bench
    ///
    /// Stimulus is built before the module leaves reset, so a bad option
    /// fails the case without clocking anything.
    pub async fn run<S, K, D>(
        &self,
        bench: Bench<S, K, D>,
        timing: Timing,
        debug: bool,
    ) -> Result<RunReport, HarnessError>
    where
        S: StreamSource,
        K: StreamSink,
        D: DeviceUnderTest,
    {
        // dropping the harness on an early return stops the module's clock
        let mut harness = Harness::new(bench, timing).with_debug(debug);

        let pattern = self.pause.build(self.seed.map(|s| s ^ PAUSE_SEED_SALT))?;
        let mut payloads = self.payload.build(self.seed)?;

        harness.launch().await?;

        if let Some(pattern) = pattern {
            harness.set_pause_pattern(pattern)?;
        }
        harness.send_from(payloads.as_mut(), self.items).await?;

        harness.finish().await
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (pause={}, payload={})",
            self.name(),
            self.pause,
            self.payload
        )
    }
}

// keeps the pause and payload streams of one case uncorrelated
const PAUSE_SEED_SALT: u64 = 0x5DEE_CE66_D1CE_5EED;

/// Outcome of one expanded case
#[derive(Debug, Clone)]
pub struct CaseResult {
    /// The case that ran
    pub case: TestCase,

    /// Report on success, the violated invariant otherwise
    pub outcome: Result<RunReport, HarnessError>,
}

impl CaseResult {
    /// Whether the case passed
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Builds the Cartesian product of pause and payload options
#[derive(Debug, Clone)]
pub struct TestFactory {
    pause_options: Vec<PauseOption>,
    payload_options: Vec<PayloadOption>,
    items: usize,
    seed: Option<u64>,
    timing: Timing,
    debug: bool,
}

impl Default for TestFactory {
    fn default() -> Self {
        Self {
            pause_options: PauseOption::all(),
            payload_options: PayloadOption::all(),
            items: DEFAULT_ITEMS_PER_CASE,
            seed: None,
            timing: Timing::default(),
            debug: false,
        }
    }
}

impl TestFactory {
    /// Standard matrix: 3 pause options × 2 payload options, 64 items each
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pause options
    pub fn pause_options(mut self, options: Vec<PauseOption>) -> Self {
        self.pause_options = options;
        self
    }

    /// Replace the payload options
    pub fn payload_options(mut self, options: Vec<PayloadOption>) -> Self {
        self.payload_options = options;
        self
    }

    /// Payloads per case
    pub fn items(mut self, items: usize) -> Self {
        self.items = items;
        self
    }

    /// Base seed; each case derives its own from it
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Harness timing used by every case
    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Per-frame debug logging in every case
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Expand the matrix, pause-major
    pub fn cases(&self) -> Vec<TestCase> {
        let mut cases = Vec::with_capacity(self.pause_options.len() * self.payload_options.len());
        for pause in &self.pause_options {
            for payload in &self.payload_options {
                let index = cases.len() + 1;
                cases.push(TestCase {
                    index,
                    pause: *pause,
                    payload: *payload,
                    items: self.items,
                    seed: self.seed.map(|s| derive_seed(s, index)),
                });
            }
        }
        cases
    }

    /// Run every case, each on a bench produced by `make_bench`
    ///
    /// `on_case` sees each result as soon as its case is done. A failing case
    /// does not stop the others.
    pub async fn run_all<F, C, S, K, D>(&self, mut make_bench: F, mut on_case: C) -> Vec<CaseResult>
    where
        F: FnMut(&TestCase) -> Result<Bench<S, K, D>, HarnessError>,
        C: FnMut(&CaseResult),
        S: StreamSource,
        K: StreamSink,
        D: DeviceUnderTest,
    {
        let mut results = Vec::new();

        for case in self.cases() {
            let outcome = match make_bench(&case) {
                Ok(bench) => case.run(bench, self.timing, self.debug).await,
                Err(e) => Err(e),
            };

            #[cfg(feature = "logging")]
            match &outcome {
                Ok(report) => info!("{} passed ({} frames)", case, report.counters.received),
                Err(e) => error!("{} failed: {}", case, e),
            }

            let result = CaseResult { case, outcome };
            on_case(&result);
            results.push(result);
        }

        results
    }
}

fn derive_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add((index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}
