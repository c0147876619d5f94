//! Store trait abstraction for the pending command collection

use async_trait::async_trait;
use thiserror::Error;

/// Failures talking to the remote store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("fetch failed: HTTP {status} {message}")]
    RemoteFetch { status: u16, message: String },

    #[error("delete failed: HTTP {status} {message}")]
    RemoteDelete { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// A collection of pending command records
#[async_trait]
pub trait CommandStore: Send + Sync {
    /// Fetch the raw response body listing pending records, oldest first
    async fn fetch_pending(&self) -> Result<String, StoreError>;

    /// Remove a record by id
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
