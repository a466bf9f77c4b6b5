//! Constants and defaults for the encapsulated frame format and the harness

/// Width of a MAC address in bytes
pub const MAC_ADDR_LEN: usize = 6;

/// Width of the ethertype field in bytes (big-endian on the wire)
pub const ETHERTYPE_LEN: usize = 2;

/// Header size: destination MAC + source MAC + ethertype
/// 6 (dst) + 6 (src) + 2 (type) = 14 bytes
pub const HEADER_WIDTH: usize = 2 * MAC_ADDR_LEN + ETHERTYPE_LEN;

/// Number of stimulus items driven by each generated test case
pub const DEFAULT_ITEMS_PER_CASE: usize = 64;

/// Default upper bound (exclusive) on randomized payload length
pub const DEFAULT_MAX_PAYLOAD: usize = 64;

/// Default probability that the random pause pattern stalls a cycle
pub const DEFAULT_PAUSE_PROBABILITY: f64 = 0.1;

/// Cycles reset is held asserted (20 ns at a 10 ns clock)
pub const DEFAULT_RESET_CYCLES: u32 = 2;

/// Idle cycles inserted after every frame so the encapsulator can resynchronize
pub const DEFAULT_INTER_FRAME_GAP: u32 = 1;

/// Cycles waited between groups of directed sends
pub const DEFAULT_SETTLE_CYCLES: u32 = 3;

/// Cycles waited after the last send: two for the header plus pipeline latency
pub const DEFAULT_DRAIN_CYCLES: u32 = 5;

/// Bytes moved per beat on the simulated stream (64-bit data path)
pub const DEFAULT_BUS_WIDTH: usize = 8;

/// Frames the simulated source accepts before `submit` starts to wait
pub const DEFAULT_SOURCE_DEPTH: usize = 4;

/// Period of the simulated clock
pub const CLOCK_PERIOD_NS: u64 = 10;

/// Fixed-cycle pause pattern, `true` meaning the source is stalled that cycle
pub const CYCLE_PAUSE_PATTERN: [bool; 4] = [false, false, false, true];
