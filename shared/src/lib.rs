//! Shop Bridge Shared Types
//!
//! This crate provides the I/O-free pieces of the shop command bridge:
//! record splitting and field extraction, the pending command model,
//! the per-record lifecycle, and the RCON packet codec.

pub mod codec;
pub mod json;
pub mod lifecycle;
pub mod record;

// Re-export commonly used types at crate root
pub use lifecycle::{RecordEvent, RecordLifecycle, RecordState, TransitionResult};
pub use record::{parse_commands, ParseError, ParsedBatch, PendingCommand};

/// Default operating parameters for the bridge
pub mod defaults {
    /// Poll interval in seconds
    pub const POLL_INTERVAL_SECS: u64 = 15;

    /// Lower bound of the recommended poll interval range
    pub const POLL_INTERVAL_MIN_RECOMMENDED_SECS: u64 = 10;

    /// Upper bound of the recommended poll interval range
    pub const POLL_INTERVAL_MAX_RECOMMENDED_SECS: u64 = 20;

    /// Timeout for a single fetch or delete request
    pub const HTTP_TIMEOUT_SECS: u64 = 10;

    /// Timeout for connecting to the game host
    pub const HOST_CONNECT_TIMEOUT_SECS: u64 = 5;

    /// Default RCON endpoint of a local game server
    pub const RCON_ADDRESS: &str = "127.0.0.1:25575";

    /// How long shutdown waits for record deletes still in flight
    pub const DELETE_DRAIN_TIMEOUT_SECS: u64 = 5;

    /// Capacity of the channel feeding the main execution context
    pub const MAIN_QUEUE_CAPACITY: usize = 256;

    /// Game ticks per second on the host
    pub const TICKS_PER_SECOND: u64 = 20;

    /// Convert a period in seconds to host ticks
    pub fn seconds_to_ticks(seconds: u64) -> u64 {
        seconds.saturating_mul(TICKS_PER_SECOND)
    }
}
