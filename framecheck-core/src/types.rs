//! Core types: header configuration, harness timing, payloads and frames

use crate::constants::{
    DEFAULT_DRAIN_CYCLES, DEFAULT_INTER_FRAME_GAP, DEFAULT_RESET_CYCLES, DEFAULT_SETTLE_CYCLES,
    MAC_ADDR_LEN,
};
use crate::error::HarnessError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw payload handed to the driver. Never empty.
pub type Payload = Bytes;

/// Fully encapsulated frame: header followed by the payload
pub type Frame = Bytes;

/// 48-bit MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; MAC_ADDR_LEN]);

impl MacAddr {
    /// Create an address from its six octets
    pub const fn new(octets: [u8; MAC_ADDR_LEN]) -> Self {
        Self(octets)
    }

    /// Borrow the octets in wire order
    pub const fn octets(&self) -> &[u8; MAC_ADDR_LEN] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MacAddr {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; MAC_ADDR_LEN];
        let mut parts = s.split(|c| c == ':' || c == '-');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| HarnessError::InvalidConfig(format!("MAC address too short: {s}")))?;
            *octet = u8::from_str_radix(part, 16).map_err(|_| {
                HarnessError::InvalidConfig(format!("Bad MAC address octet {part:?} in {s}"))
            })?;
        }

        if parts.next().is_some() {
            return Err(HarnessError::InvalidConfig(format!(
                "MAC address too long: {s}"
            )));
        }

        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = HarnessError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(value: MacAddr) -> Self {
        value.to_string()
    }
}

/// Header fields the module under test prepends to every payload.
///
/// Captured once before a run and never mutated; every expected frame of the
/// run is built from the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthConfig {
    /// Destination MAC address
    pub dst: MacAddr,

    /// Source MAC address
    pub src: MacAddr,

    /// Protocol / ethertype field
    pub ethertype: u16,
}

impl EthConfig {
    /// Create a new header configuration
    pub const fn new(dst: MacAddr, src: MacAddr, ethertype: u16) -> Self {
        Self {
            dst,
            src,
            ethertype,
        }
    }
}

impl Default for EthConfig {
    fn default() -> Self {
        Self {
            dst: MacAddr([0xFF; MAC_ADDR_LEN]),
            src: MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            ethertype: 0x88B5,
        }
    }
}

/// Cycle counts the harness waits at fixed points of a run.
///
/// These are tuned to the pipeline latency of a particular module, so they
/// travel with the harness instead of being hard-wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Cycles reset is held asserted
    pub reset_cycles: u32,

    /// Idle cycles after each frame transfer drains
    pub inter_frame_gap: u32,

    /// Cycles between groups of directed sends
    pub settle_cycles: u32,

    /// Cycles waited after the last send before evaluation
    pub drain_cycles: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reset_cycles: DEFAULT_RESET_CYCLES,
            inter_frame_gap: DEFAULT_INTER_FRAME_GAP,
            settle_cycles: DEFAULT_SETTLE_CYCLES,
            drain_cycles: DEFAULT_DRAIN_CYCLES,
        }
    }
}
