//! Recurring fetch + parse
//!
//! The poller runs off the main context so store latency never blocks
//! command execution. Parsed records are handed to the main context over
//! its queue.

mod runner;

pub use runner::{CycleReport, Poller, PollerHandle};
