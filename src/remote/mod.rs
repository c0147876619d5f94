//! Remote store access
//!
//! This module handles:
//! - Fetching pending command records (status `pending`, oldest first)
//! - Deleting records once they have been dispatched
//! - The `CommandStore` seam the poller and dispatcher are written against

mod client;
mod traits;

pub use client::RemoteStore;
pub use traits::{CommandStore, StoreError};
