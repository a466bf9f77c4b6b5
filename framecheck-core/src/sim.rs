//! Cycle model of the encapsulator and both stream endpoints.
//!
//! Lets the harness run without hardware. A clock task ticks on tokio time;
//! on a paused runtime time only advances once every task is waiting, so each
//! edge is seen by every waiter before the next one fires.
//!
//! Per cycle, in order:
//! 1. output stage moves up to `width` bytes of the FIFO to the sink, never
//!    crossing a frame boundary within one beat
//! 2. input stage samples the pause pattern and, when the source is neither
//!    paused nor blocked by a full FIFO, accepts one beat; at the start of a
//!    frame it loads the header instead and holds the first beat until the
//!    header has drained below one beat
//!
//! Anything accepted in a cycle leaves at the earliest on the next one. The
//! FIFO never holds more than two beats once payload is flowing, so the last
//! frame surfaces within three cycles of the source going idle whatever the
//! bus width.

use crate::bus::{Bench, DeviceUnderTest, StreamSink, StreamSource};
use crate::constants::{CLOCK_PERIOD_NS, DEFAULT_BUS_WIDTH, DEFAULT_SOURCE_DEPTH, HEADER_WIDTH};
use crate::error::HarnessError;
use crate::model::header_bytes;
use crate::stimulus::{no_pause, PauseStream};
use crate::types::{EthConfig, Frame, Payload};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Misbehaviour injected into the n-th output frame (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fault {
    /// Flip the low bit of one byte; offsets past the end hit the last byte
    Corrupt {
        /// Output frame index.
        index: u64,
        /// Byte offset within the frame.
        offset: usize,
    },
    /// Swallow the frame
    Drop {
        /// Output frame index.
        index: u64,
    },
    /// Emit the frame twice
    Duplicate {
        /// Output frame index.
        index: u64,
    },
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Corrupt { index, offset } => write!(f, "corrupt:{index}:{offset}"),
            Fault::Drop { index } => write!(f, "drop:{index}"),
            Fault::Duplicate { index } => write!(f, "duplicate:{index}"),
        }
    }
}

impl FromStr for Fault {
    type Err = HarnessError;

    /// `corrupt:<index>[:<offset>]`, `drop:<index>` or `duplicate:<index>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || HarnessError::InvalidConfig(format!("Unrecognized fault: {s}"));
        let number = |part: Option<&str>| -> Result<u64, HarnessError> {
            part.ok_or_else(bad)?.parse().map_err(|_| bad())
        };

        let mut parts = s.split(':');
        let fault = match parts.next() {
            Some("corrupt") => {
                let index = number(parts.next())?;
                let offset = match parts.next() {
                    Some(offset) => offset.parse().map_err(|_| bad())?,
                    None => HEADER_WIDTH,
                };
                Fault::Corrupt { index, offset }
            }
            Some("drop") => Fault::Drop {
                index: number(parts.next())?,
            },
            Some("duplicate") => Fault::Duplicate {
                index: number(parts.next())?,
            },
            _ => return Err(bad()),
        };

        if parts.next().is_some() {
            return Err(bad());
        }
        Ok(fault)
    }
}

/// Parameters of the simulated module and bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Bytes per beat
    pub width: usize,

    /// Frames the source queues before `submit` waits
    pub source_depth: usize,

    /// Optional misbehaviour on the output side
    pub fault: Option<Fault>,
}

impl SimConfig {
    /// Check the parameters can drive a simulation
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.width == 0 {
            return Err(HarnessError::InvalidConfig(
                "bus width must be at least one byte".to_string(),
            ));
        }
        if self.source_depth == 0 {
            return Err(HarnessError::InvalidConfig(
                "source depth must be at least one frame".to_string(),
            ));
        }
        Ok(())
    }

    /// Same parameters with a fault injected
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_BUS_WIDTH,
            source_depth: DEFAULT_SOURCE_DEPTH,
            fault: None,
        }
    }
}

struct SimState {
    header: [u8; HEADER_WIDTH],
    width: usize,
    depth: usize,
    fault: Option<Fault>,
    reset: bool,
    cycle: u64,

    // source
    pending: VecDeque<Payload>,
    current: Option<(Payload, usize)>,
    pause: PauseStream,

    // encapsulator
    header_loaded: bool,
    fifo: VecDeque<(u8, bool)>,
    rx_frames: u64,

    // sink
    assembling: BytesMut,
    out_frames: u64,
    output: mpsc::UnboundedSender<Frame>,
}

impl SimState {
    fn tick(&mut self) -> u64 {
        self.cycle += 1;

        if self.reset {
            self.fifo.clear();
            self.header_loaded = false;
            self.assembling.clear();
            self.rx_frames = 0;
            self.out_frames = 0;
            return self.cycle;
        }

        self.drive_output();
        self.accept_input();
        self.cycle
    }

    fn drive_output(&mut self) {
        for _ in 0..self.width {
            let Some((byte, last)) = self.fifo.pop_front() else {
                break;
            };
            self.assembling.put_u8(byte);
            if last {
                let frame = self.assembling.split().freeze();
                self.deliver(frame);
                break;
            }
        }
    }

    fn accept_input(&mut self) {
        // one pattern sample per cycle, whether or not there is data
        let paused = self.pause.next().unwrap_or(false);

        if self.current.is_none() {
            self.current = self.pending.pop_front().map(|payload| (payload, 0));
        }

        let done = {
            let Some((payload, offset)) = self.current.as_mut() else {
                return;
            };
            if paused || self.fifo.len() >= self.width {
                return;
            }

            if !self.header_loaded {
                self.fifo.extend(self.header.iter().map(|b| (*b, false)));
                self.header_loaded = true;
                return;
            }

            let end = (*offset + self.width).min(payload.len());
            let len = payload.len();
            self.fifo
                .extend(payload[*offset..end].iter().enumerate().map(|(i, b)| {
                    let pos = *offset + i;
                    (*b, pos + 1 == len)
                }));
            *offset = end;
            end == len
        };

        if done {
            self.rx_frames += 1;
            self.current = None;
            self.header_loaded = false;
        }
    }

    fn deliver(&mut self, frame: Frame) {
        let index = self.out_frames;
        self.out_frames += 1;

        match self.fault {
            Some(Fault::Drop { index: target }) if target == index => {
                #[cfg(feature = "logging")]
                warn!("Fault: dropping output frame {}", index);
            }
            Some(Fault::Duplicate { index: target }) if target == index => {
                #[cfg(feature = "logging")]
                warn!("Fault: duplicating output frame {}", index);
                let _ = self.output.send(frame.clone());
                let _ = self.output.send(frame);
            }
            Some(Fault::Corrupt {
                index: target,
                offset,
            }) if target == index && !frame.is_empty() => {
                #[cfg(feature = "logging")]
                warn!("Fault: corrupting output frame {}", index);
                let mut bytes = frame.to_vec();
                let at = offset.min(bytes.len() - 1);
                bytes[at] ^= 0x01;
                let _ = self.output.send(Bytes::from(bytes));
            }
            _ => {
                let _ = self.output.send(frame);
            }
        }
    }

    fn source_idle(&self) -> bool {
        self.pending.is_empty() && self.current.is_none()
    }
}

struct Shared {
    config: EthConfig,
    state: Mutex<SimState>,
    edges: watch::Sender<u64>,
    clock: Mutex<Option<AbortHandle>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait_edges(&self, count: u32) {
        let mut rx = self.edges.subscribe();
        for _ in 0..count {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

async fn run_clock(shared: Arc<Shared>) {
    let period = Duration::from_nanos(CLOCK_PERIOD_NS);
    loop {
        tokio::time::sleep(period).await;
        let cycle = shared.lock().tick();
        shared.edges.send_replace(cycle);
    }
}

/// Start a simulated encapsulator and return its bench
///
/// Spawns the clock task, so it must be called from within a tokio runtime.
pub fn spawn(
    config: EthConfig,
    sim: SimConfig,
) -> Result<Bench<SimSource, SimSink, SimDut>, HarnessError> {
    sim.validate()?;

    let (output, frames) = mpsc::unbounded_channel();
    let (edges, _) = watch::channel(0);

    let state = SimState {
        header: header_bytes(&config),
        width: sim.width,
        depth: sim.source_depth,
        fault: sim.fault,
        reset: false,
        cycle: 0,
        pending: VecDeque::new(),
        current: None,
        pause: Box::new(no_pause()),
        header_loaded: false,
        fifo: VecDeque::new(),
        rx_frames: 0,
        assembling: BytesMut::new(),
        out_frames: 0,
        output,
    };

    let shared = Arc::new(Shared {
        config,
        state: Mutex::new(state),
        edges,
        clock: Mutex::new(None),
    });

    let clock = tokio::spawn(run_clock(shared.clone()));
    *shared.clock.lock().unwrap_or_else(PoisonError::into_inner) = Some(clock.abort_handle());

    #[cfg(feature = "logging")]
    debug!(
        "Simulated encapsulator up: {}B beats, dst {}, src {}, type {:#06x}",
        sim.width, config.dst, config.src, config.ethertype
    );

    Ok(Bench::new(
        SimSource {
            shared: shared.clone(),
        },
        SimSink { frames },
        SimDut { shared },
    ))
}

/// Input side of the simulated stream
pub struct SimSource {
    shared: Arc<Shared>,
}

impl StreamSource for SimSource {
    fn set_pause_pattern(&mut self, pattern: PauseStream) {
        self.shared.lock().pause = pattern;
    }

    async fn submit(&mut self, payload: Payload) -> Result<(), HarnessError> {
        loop {
            {
                let mut state = self.shared.lock();
                if state.pending.len() < state.depth {
                    state.pending.push_back(payload);
                    return Ok(());
                }
            }
            self.shared.wait_edges(1).await;
        }
    }

    async fn wait_idle(&mut self) -> Result<(), HarnessError> {
        loop {
            let idle = self.shared.lock().source_idle();
            if idle {
                return Ok(());
            }
            self.shared.wait_edges(1).await;
        }
    }
}

/// Output side of the simulated stream
pub struct SimSink {
    frames: mpsc::UnboundedReceiver<Frame>,
}

impl StreamSink for SimSink {
    async fn receive(&mut self) -> Result<Frame, HarnessError> {
        self.frames.recv().await.ok_or(HarnessError::BusClosed)
    }
}

/// Clock, reset and introspection of the simulated module
#[derive(Clone)]
pub struct SimDut {
    shared: Arc<Shared>,
}

impl SimDut {
    /// Rising edges since the clock started
    pub fn cycle(&self) -> u64 {
        self.shared.lock().cycle
    }
}

impl DeviceUnderTest for SimDut {
    fn config(&self) -> EthConfig {
        self.shared.config
    }

    fn set_reset(&self, asserted: bool) {
        self.shared.lock().reset = asserted;
    }

    async fn rising_edges(&self, count: u32) {
        self.shared.wait_edges(count).await;
    }

    fn rx_frame_count(&self) -> u64 {
        self.shared.lock().rx_frames
    }

    fn halt(&self) {
        let clock = self
            .shared
            .clock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(clock) = clock {
            clock.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::compute_expected;
    use crate::stimulus::CyclePause;

    #[test]
    fn test_fault_parse() {
        assert_eq!(
            "corrupt:3:20".parse::<Fault>().unwrap(),
            Fault::Corrupt {
                index: 3,
                offset: 20
            }
        );
        assert_eq!(
            "corrupt:3".parse::<Fault>().unwrap(),
            Fault::Corrupt {
                index: 3,
                offset: HEADER_WIDTH
            }
        );
        assert_eq!("drop:0".parse::<Fault>().unwrap(), Fault::Drop { index: 0 });
        assert_eq!(
            "duplicate:7".parse::<Fault>().unwrap(),
            Fault::Duplicate { index: 7 }
        );
        assert!("drop".parse::<Fault>().is_err());
        assert!("drop:1:2".parse::<Fault>().is_err());
        assert!("melt:1".parse::<Fault>().is_err());
    }

    #[test]
    fn test_fault_display_round_trip() {
        let fault = Fault::Corrupt {
            index: 2,
            offset: 5,
        };
        assert_eq!(fault.to_string().parse::<Fault>().unwrap(), fault);
    }

    #[test]
    fn test_sim_config_validate() {
        assert!(SimConfig::default().validate().is_ok());
        let zero = SimConfig {
            width: 0,
            ..SimConfig::default()
        };
        assert!(zero.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pass_through_frames() {
        let config = EthConfig::default();
        let mut bench = spawn(config, SimConfig::default()).unwrap();

        bench.source.submit(Bytes::from_static(&[1, 2, 3])).await.unwrap();
        bench.source.submit(Bytes::from(vec![9u8; 20])).await.unwrap();
        bench.source.wait_idle().await.unwrap();

        let first = bench.sink.receive().await.unwrap();
        let second = bench.sink.receive().await.unwrap();

        assert_eq!(first, compute_expected(&[1, 2, 3], &config));
        assert_eq!(second, compute_expected(&[9u8; 20], &config));
        assert_eq!(bench.dut.rx_frame_count(), 2);
        bench.dut.halt();
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_slows_input() {
        let config = EthConfig::default();
        let payload = Bytes::from(vec![0x5A; 64]);

        let mut fast = spawn(config, SimConfig::default()).unwrap();
        let start = fast.dut.cycle();
        fast.source.submit(payload.clone()).await.unwrap();
        fast.source.wait_idle().await.unwrap();
        let unpaused = fast.dut.cycle() - start;
        fast.dut.halt();

        let mut slow = spawn(config, SimConfig::default()).unwrap();
        slow.source.set_pause_pattern(Box::new(CyclePause::new()));
        let start = slow.dut.cycle();
        slow.source.submit(payload.clone()).await.unwrap();
        slow.source.wait_idle().await.unwrap();
        let paused = slow.dut.cycle() - start;

        assert!(paused > unpaused, "paused {paused} vs unpaused {unpaused}");
        assert_eq!(
            slow.sink.receive().await.unwrap(),
            compute_expected(&payload, &config)
        );
        slow.dut.halt();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_counter() {
        let mut bench = spawn(EthConfig::default(), SimConfig::default()).unwrap();

        bench.source.submit(Bytes::from_static(b"x")).await.unwrap();
        bench.source.wait_idle().await.unwrap();
        assert_eq!(bench.dut.rx_frame_count(), 1);

        bench.dut.set_reset(true);
        bench.dut.rising_edges(2).await;
        bench.dut.set_reset(false);
        assert_eq!(bench.dut.rx_frame_count(), 0);
        bench.dut.halt();
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_fault() {
        let sim = SimConfig::default().with_fault(Fault::Drop { index: 0 });
        let config = EthConfig::default();
        let mut bench = spawn(config, sim).unwrap();

        bench.source.submit(Bytes::from_static(b"gone")).await.unwrap();
        bench.source.submit(Bytes::from_static(b"kept")).await.unwrap();
        bench.source.wait_idle().await.unwrap();

        let frame = bench.sink.receive().await.unwrap();
        assert_eq!(frame, compute_expected(b"kept", &config));
        bench.dut.halt();
    }
}
