//! Reference model of the encapsulator

use crate::constants::HEADER_WIDTH;
use crate::types::{EthConfig, Frame};
use bytes::{BufMut, BytesMut};
use std::fmt::Write;

/// Serialize the header fields in wire order
///
/// Layout:
/// 1. Destination MAC (6 bytes)
/// 2. Source MAC (6 bytes)
/// 3. Ethertype (2 bytes, big-endian)
///
/// Every expected frame depends on this ordering matching the module's own
/// framing logic; a mismatch shows up as every frame failing the same way.
pub fn header_bytes(config: &EthConfig) -> [u8; HEADER_WIDTH] {
    let mut header = [0u8; HEADER_WIDTH];
    header[0..6].copy_from_slice(config.dst.octets());
    header[6..12].copy_from_slice(config.src.octets());
    header[12..14].copy_from_slice(&config.ethertype.to_be_bytes());
    header
}

/// Compute the frame the module should emit for `payload`
pub fn compute_expected(payload: &[u8], config: &EthConfig) -> Frame {
    let mut buf = BytesMut::with_capacity(HEADER_WIDTH + payload.len());
    buf.put_slice(&header_bytes(config));
    buf.put_slice(payload);
    buf.freeze()
}

/// Reference model bound to the configuration of one harness run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceModel {
    config: EthConfig,
}

impl ReferenceModel {
    /// Create a model for a fixed header configuration
    pub const fn new(config: EthConfig) -> Self {
        Self { config }
    }

    /// Configuration every expectation is built from
    pub const fn config(&self) -> &EthConfig {
        &self.config
    }

    /// Expected frame for one payload
    pub fn expected(&self, payload: &[u8]) -> Frame {
        compute_expected(payload, &self.config)
    }
}

/// Render bytes as space-separated upper-case hex, e.g. `"01 02 FF "`
pub fn hexify(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 3);
    for byte in data {
        let _ = write!(out, "{byte:02X} ");
    }
    out
}

/// Per-byte diff line aligned with [`hexify`] output
///
/// Each position renders as three blanks when both sides agree and `~~ `
/// when they differ. Positions present on only one side count as differing.
pub fn diff_markers(expected: &[u8], received: &[u8]) -> String {
    let len = expected.len().max(received.len());
    let mut out = String::with_capacity(len * 3);
    for i in 0..len {
        match (expected.get(i), received.get(i)) {
            (Some(e), Some(r)) if e == r => out.push_str("   "),
            _ => out.push_str("~~ "),
        }
    }
    out
}
