//! Send path: pushes payloads into the module and records what should come out

use crate::bus::{DeviceUnderTest, StreamSource};
use crate::error::HarnessError;
use crate::model::ReferenceModel;
use crate::scoreboard::{ExpectationQueue, Tally};
use crate::stimulus::PauseStream;
use crate::types::Payload;
use std::sync::Arc;

#[cfg(feature = "logging")]
use crate::model::hexify;
#[cfg(feature = "logging")]
use tracing::debug;

/// Drives one payload at a time through a [`StreamSource`]
///
/// The driver is the only writer of the `sent` counter and the only producer
/// on the expectation queue.
pub struct StreamDriver<S> {
    source: S,
    model: ReferenceModel,
    expectations: ExpectationQueue,
    tally: Arc<Tally>,
    inter_frame_gap: u32,
    #[cfg_attr(not(feature = "logging"), allow(dead_code))]
    debug: bool,
}

impl<S: StreamSource> StreamDriver<S> {
    /// Create a driver feeding `source` and queueing expectations for the scoreboard
    pub fn new(
        source: S,
        model: ReferenceModel,
        expectations: ExpectationQueue,
        tally: Arc<Tally>,
        inter_frame_gap: u32,
    ) -> Self {
        Self {
            source,
            model,
            expectations,
            tally,
            inter_frame_gap,
            debug: false,
        }
    }

    /// Log every payload and its expected frame
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Configure backpressure for the rest of the run
    pub fn set_pause_pattern(&mut self, pattern: PauseStream) {
        self.source.set_pause_pattern(pattern);
    }

    /// Transmit one payload and wait for it to drain
    ///
    /// The expectation is queued right after the bus accepts the transfer and
    /// before waiting for the drain, so it is always in place before the
    /// scoreboard can observe the matching output.
    pub async fn send<D: DeviceUnderTest>(
        &mut self,
        dut: &D,
        payload: Payload,
    ) -> Result<(), HarnessError> {
        if payload.is_empty() {
            return Err(HarnessError::EmptyPayload);
        }

        let expected = self.model.expected(&payload);
        self.source.submit(payload.clone()).await?;

        #[cfg(feature = "logging")]
        if self.debug {
            debug!("Payload         : {}", hexify(&payload));
            debug!("Expected Packet : {}", hexify(&expected));
        }

        self.expectations.push(expected);

        self.source.wait_idle().await?;
        self.tally.record_sent();

        dut.rising_edges(self.inter_frame_gap).await;
        Ok(())
    }

    /// Reference model in use
    pub fn model(&self) -> &ReferenceModel {
        &self.model
    }
}
