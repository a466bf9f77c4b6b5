//! Orchestrates one verification run: reset, drive, drain, evaluate

use crate::bus::{Bench, DeviceUnderTest, StreamSink, StreamSource};
use crate::driver::StreamDriver;
use crate::error::HarnessError;
use crate::model::ReferenceModel;
use crate::scoreboard::{Counters, ExpectationQueue, Scoreboard, Scorer, Tally};
use crate::stimulus::PauseStream;
use crate::types::{EthConfig, Payload, Timing};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[cfg(feature = "logging")]
use tracing::{debug, info};

/// Lifecycle of a harness run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, nothing driven yet
    Idle,
    /// Reset asserted
    Resetting,
    /// Scoreboard running, sends allowed
    Running,
    /// Waiting for the last frame to surface
    Draining,
    /// Counters frozen and judged
    Evaluated,
}

impl Phase {
    /// Lower-case name for messages
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Resetting => "resetting",
            Phase::Running => "running",
            Phase::Draining => "draining",
            Phase::Evaluated => "evaluated",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Counters at evaluation time
    pub counters: Counters,

    /// Frames the module itself recorded as received
    pub dut_frames: u64,

    /// Expectations never matched by an arrival
    pub outstanding: usize,
}

impl RunReport {
    /// Check the end-of-run invariants
    ///
    /// 1. No bad frames (unexpected arrivals reported first)
    /// 2. At least one frame received
    /// 3. Sent and received counts agree
    /// 4. Received count agrees with the module's own counter
    pub fn assert_state(&self) -> Result<(), HarnessError> {
        let c = &self.counters;

        if c.unexpected > 0 {
            return Err(HarnessError::UnexpectedOutput(c.unexpected));
        }

        if c.errors > 0 {
            return Err(HarnessError::BadFrames(c.errors));
        }

        if c.received == 0 {
            return Err(HarnessError::Starvation);
        }

        if c.sent != c.received {
            return Err(HarnessError::CountMismatch {
                sent: c.sent,
                received: c.received,
            });
        }

        if c.received != self.dut_frames {
            return Err(HarnessError::DutCountMismatch {
                received: c.received,
                dut: self.dut_frames,
            });
        }

        Ok(())
    }

    /// Whether every invariant holds
    pub fn passed(&self) -> bool {
        self.assert_state().is_ok()
    }
}

/// Verification harness around one module instance
///
/// Sends are strictly sequential; the only concurrency is the scoreboard
/// task consuming output while the driver is feeding input.
pub struct Harness<S, K, D>
where
    S: StreamSource,
    K: StreamSink,
    D: DeviceUnderTest,
{
    dut: D,
    driver: StreamDriver<S>,
    sink: Option<K>,
    scorer: Scorer,
    expectations: ExpectationQueue,
    tally: Arc<Tally>,
    timing: Timing,
    phase: Phase,
    monitor: Option<JoinHandle<()>>,
}

impl<S, K, D> Harness<S, K, D>
where
    S: StreamSource,
    K: StreamSink,
    D: DeviceUnderTest,
{
    /// Create a harness, reading the header fields from the module itself
    pub fn new(bench: Bench<S, K, D>, timing: Timing) -> Self {
        let config = bench.dut.config();
        Self::with_config(config, bench, timing)
    }

    /// Create a harness that expects frames built with `config`
    ///
    /// The module's own configuration is not consulted.
    pub fn with_config(config: EthConfig, bench: Bench<S, K, D>, timing: Timing) -> Self {
        let expectations = ExpectationQueue::new();
        let tally = Arc::new(Tally::new());
        let driver = StreamDriver::new(
            bench.source,
            ReferenceModel::new(config),
            expectations.clone(),
            tally.clone(),
            timing.inter_frame_gap,
        );
        let scorer = Scorer::new(expectations.clone(), tally.clone());

        Self {
            dut: bench.dut,
            driver,
            sink: Some(bench.sink),
            scorer,
            expectations,
            tally,
            timing,
            phase: Phase::Idle,
            monitor: None,
        }
    }

    /// Log each payload, expectation and correct arrival
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.driver.set_debug(debug);
        self.scorer.set_debug(debug);
        self
    }

    /// Reset the module and start the scoreboard
    pub async fn launch(&mut self) -> Result<(), HarnessError> {
        self.expect_phase(Phase::Idle)?;

        self.phase = Phase::Resetting;
        self.dut.set_reset(true);
        self.dut.rising_edges(self.timing.reset_cycles).await;
        self.dut.set_reset(false);
        self.dut.rising_edges(1).await;

        #[cfg(feature = "logging")]
        debug!("Out of reset");

        let sink = self.sink.take().ok_or(HarnessError::InvalidPhase {
            expected: Phase::Idle.as_str(),
            actual: self.phase.as_str(),
        })?;
        let scoreboard = Scoreboard::new(sink, self.scorer.clone());
        self.monitor = Some(tokio::spawn(scoreboard.run()));

        self.phase = Phase::Running;
        Ok(())
    }

    /// Apply backpressure to the input stream for the rest of the run
    pub fn set_pause_pattern(&mut self, pattern: PauseStream) -> Result<(), HarnessError> {
        self.expect_phase(Phase::Running)?;
        self.driver.set_pause_pattern(pattern);
        Ok(())
    }

    /// Send one payload and wait for it to drain
    pub async fn send(&mut self, payload: impl Into<Payload>) -> Result<(), HarnessError> {
        self.expect_phase(Phase::Running)?;
        self.driver.send(&self.dut, payload.into()).await
    }

    /// Send `count` payloads drawn from `payloads`, one after another
    pub async fn send_from<I>(&mut self, payloads: &mut I, count: usize) -> Result<(), HarnessError>
    where
        I: Iterator<Item = Payload> + ?Sized,
    {
        for _ in 0..count {
            let Some(payload) = payloads.next() else {
                break;
            };
            self.send(payload).await?;
        }
        Ok(())
    }

    /// Idle for the configured settle time between groups of sends
    pub async fn settle(&mut self) -> Result<(), HarnessError> {
        self.idle(self.timing.settle_cycles).await
    }

    /// Idle for `cycles` clock edges
    pub async fn idle(&mut self, cycles: u32) -> Result<(), HarnessError> {
        self.expect_phase(Phase::Running)?;
        self.dut.rising_edges(cycles).await;
        Ok(())
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Counters as they stand
    pub fn counters(&self) -> Counters {
        self.tally.snapshot()
    }

    /// Module handle
    pub fn dut(&self) -> &D {
        &self.dut
    }

    /// Reference model the driver builds expectations with
    pub fn model(&self) -> &ReferenceModel {
        self.driver.model()
    }

    /// Drain, stop the scoreboard and collect the final counters
    ///
    /// Does not judge them; see [`Harness::finish`].
    pub async fn conclude(mut self) -> Result<RunReport, HarnessError> {
        self.expect_phase(Phase::Running)?;

        self.phase = Phase::Draining;
        self.dut.rising_edges(self.timing.drain_cycles).await;
        // let the scoreboard take anything delivered on the final edge
        tokio::task::yield_now().await;

        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        self.phase = Phase::Evaluated;

        let report = RunReport {
            counters: self.tally.snapshot(),
            dut_frames: self.dut.rx_frame_count(),
            outstanding: self.expectations.len(),
        };
        self.dut.halt();

        #[cfg(feature = "logging")]
        info!(
            "Run complete: sent {}, received {}, errors {}, module counted {}",
            report.counters.sent,
            report.counters.received,
            report.counters.errors,
            report.dut_frames
        );

        Ok(report)
    }

    /// Drain, stop the scoreboard and assert the end-of-run invariants
    pub async fn finish(self) -> Result<RunReport, HarnessError> {
        let report = self.conclude().await?;
        report.assert_state()?;
        Ok(report)
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), HarnessError> {
        if self.phase != expected {
            return Err(HarnessError::InvalidPhase {
                expected: expected.as_str(),
                actual: self.phase.as_str(),
            });
        }
        Ok(())
    }
}

impl<S, K, D> Drop for Harness<S, K, D>
where
    S: StreamSource,
    K: StreamSink,
    D: DeviceUnderTest,
{
    // also covers runs abandoned on an error before `conclude`
    fn drop(&mut self) {
        if let Some(monitor) = self.monitor.take() {
            monitor.abort();
        }
        self.dut.halt();
    }
}
