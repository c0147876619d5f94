//! Command dispatch for fetched records
//!
//! This module handles:
//! - The de-duplication ledger shared by the poller and the dispatcher
//! - Deciding whether a record runs (online, pending, not yet handled)
//! - Running commands on the single main execution context
//! - Scheduling best-effort deletion from the remote store

mod engine;
mod ledger;
mod main_context;
mod stats;

pub use engine::{DispatchEngine, DispatchError, DispatchOutcome};
pub use ledger::Ledger;
pub use main_context::{MainContext, MainContextHandle, MainTask};
pub use stats::{BridgeStats, StatsSnapshot};
