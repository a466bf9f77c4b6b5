//! # Framecheck Core
//!
//! Functional verification harness for a module that prepends a fixed
//! Ethernet header to arbitrary payloads.
//!
//! ## Modules
//!
//! - `constants`: Header layout and harness defaults
//! - `types`: Core types (EthConfig, MacAddr, Timing)
//! - `model`: Reference model computing expected frames
//! - `stimulus`: Payload and backpressure generators
//! - `bus`: Contract with the stream bus and module under test
//! - `driver`: Send path
//! - `scoreboard`: Receive path and counters
//! - `harness`: Run orchestration and final invariants
//! - `factory`: Cartesian expansion of stimulus options
//! - `scenarios`: Directed scenarios
//! - `sim`: Simulated encapsulator for running without hardware

#![warn(missing_docs)]

pub mod bus;
pub mod constants;
pub mod driver;
pub mod error;
pub mod factory;
pub mod harness;
pub mod model;
pub mod scenarios;
pub mod scoreboard;
pub mod sim;
pub mod stimulus;
pub mod types;

// Re-export commonly used types
pub use error::HarnessError;
pub use harness::{Harness, RunReport};
pub use model::{compute_expected, ReferenceModel};
pub use types::{EthConfig, MacAddr, Timing};

/// Result type alias for harness operations
pub type Result<T> = core::result::Result<T, HarnessError>;
