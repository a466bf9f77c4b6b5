//! Error types for harness runs

/// Errors raised while configuring, driving or evaluating a harness run
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    /// Frames whose content did not match the expectation at the queue head
    #[error("{0} bad frames received, see error log")]
    BadFrames(u64),

    /// Frames arrived while no expectation was outstanding
    #[error("{0} frames received with no outstanding expectation")]
    UnexpectedOutput(u64),

    /// Nothing came out of the module under test
    #[error("No frames were received")]
    Starvation,

    /// Driver and scoreboard disagree on the number of frames
    #[error("Sent/received frame counters don't match: sent {sent}, received {received}")]
    CountMismatch {
        /// Frames the driver completed.
        sent: u64,
        /// Frames the scoreboard observed.
        received: u64,
    },

    /// Scoreboard and the module's own counter disagree
    #[error("Module frame counter doesn't match: received {received}, module reports {dut}")]
    DutCountMismatch {
        /// Frames the scoreboard observed.
        received: u64,
        /// Frames the module under test recorded.
        dut: u64,
    },

    /// A payload must carry at least one byte
    #[error("Payload must not be empty")]
    EmptyPayload,

    /// Stimulus generator constructed with unusable parameters
    #[error("Invalid stimulus: {0}")]
    InvalidStimulus(String),

    /// Harness or simulator constructed with unusable parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The bus collaborator went away mid-run
    #[error("Stream bus closed")]
    BusClosed,

    /// Operation issued in the wrong harness phase
    #[error("Operation requires phase {expected}, harness is {actual}")]
    InvalidPhase {
        /// Phase the operation needs.
        expected: &'static str,
        /// Phase the harness is in.
        actual: &'static str,
    },

    /// IO error while loading configuration or writing reports
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        HarnessError::Io(err.to_string())
    }
}
