//! Library entry for framecheck-cli used by integration tests and embedding.

pub mod commands;

use anyhow::{Context, Result};
use framecheck_core::{EthConfig, MacAddr, Timing};
use std::fs;

/// Header fields the simulated module is built with
#[derive(Clone, Debug, clap::Args)]
pub struct HeaderArgs {
    /// Destination MAC address
    #[arg(long, default_value = "ff:ff:ff:ff:ff:ff")]
    pub dst: MacAddr,

    /// Source MAC address
    #[arg(long, default_value = "02:00:00:00:00:01")]
    pub src: MacAddr,

    /// Ethertype, decimal or 0x-prefixed hex
    #[arg(long, default_value = "0x88b5", value_parser = parse_ethertype)]
    pub ethertype: u16,
}

impl HeaderArgs {
    /// Header configuration for the run
    pub fn config(&self) -> EthConfig {
        EthConfig::new(self.dst, self.src, self.ethertype)
    }
}

impl Default for HeaderArgs {
    fn default() -> Self {
        let config = EthConfig::default();
        Self {
            dst: config.dst,
            src: config.src,
            ethertype: config.ethertype,
        }
    }
}

/// Parse an ethertype given as `0x0800` or `2048`
pub fn parse_ethertype(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid ethertype {s:?}: {e}"))
}

/// Load harness timing from a JSON file, defaults when no file is given
pub fn load_timing(path: Option<&str>) -> Result<Timing> {
    let Some(path) = path else {
        return Ok(Timing::default());
    };

    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read timing file: {}", path))?;

    serde_json::from_str(&content).with_context(|| format!("Failed to parse timing file: {}", path))
}

/// Single-threaded runtime on virtual time, as the simulated clock expects
pub fn sim_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .context("Failed to start simulation runtime")
}

// Re-export commonly used items
pub use crate::commands::{directed, expect, run};
