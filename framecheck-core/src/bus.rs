//! Contract between the harness and the streaming bus / module under test.
//!
//! The harness never touches handshake signals. It needs a source that can
//! push one frame and report when it has drained, a sink that hands back one
//! completed frame at a time, and a handle on the module for clocking, reset
//! and its own received-frame counter.

use crate::error::HarnessError;
use crate::stimulus::PauseStream;
use crate::types::{EthConfig, Frame, Payload};
use std::future::Future;

/// Sending end of the stream feeding the module under test
pub trait StreamSource: Send {
    /// Install the backpressure pattern consumed one sample per bus cycle
    fn set_pause_pattern(&mut self, pattern: PauseStream);

    /// Queue one frame transfer; resolves once the bus accepted it
    fn submit(&mut self, payload: Payload) -> impl Future<Output = Result<(), HarnessError>> + Send;

    /// Resolves once every accepted transfer has fully left the source
    fn wait_idle(&mut self) -> impl Future<Output = Result<(), HarnessError>> + Send;
}

/// Receiving end of the stream leaving the module under test
pub trait StreamSink: Send + 'static {
    /// Next completed output frame, in arrival order
    ///
    /// Returns [`HarnessError::BusClosed`] once no more frames can arrive.
    fn receive(&mut self) -> impl Future<Output = Result<Frame, HarnessError>> + Send;
}

/// Clock, reset and introspection surface of the module under test
pub trait DeviceUnderTest: Send + Sync {
    /// Header fields the module was built with
    fn config(&self) -> EthConfig;

    /// Drive the reset input
    fn set_reset(&self, asserted: bool);

    /// Resolves after `count` rising clock edges
    fn rising_edges(&self, count: u32) -> impl Future<Output = ()> + Send;

    /// Frames the module recorded as received on its input
    fn rx_frame_count(&self) -> u64;

    /// Stop clocking the module once a run is over
    fn halt(&self) {}
}

/// Everything a harness run needs from the outside world
pub struct Bench<S, K, D> {
    /// Stream into the module
    pub source: S,

    /// Stream out of the module
    pub sink: K,

    /// Clock, reset and counters of the module
    pub dut: D,
}

impl<S, K, D> Bench<S, K, D> {
    /// Bundle the three collaborators
    pub fn new(source: S, sink: K, dut: D) -> Self {
        Self { source, sink, dut }
    }
}
