//! Process-lifetime set of dispatched record ids

use std::collections::HashSet;
use tokio::sync::RwLock;

/// Ids of records already dispatched by this process.
///
/// Grows monotonically and is never persisted: a restart starts empty.
#[derive(Debug, Default)]
pub struct Ledger {
    ids: RwLock<HashSet<String>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `id` if absent. Returns `true` only for the caller that inserted it.
    pub async fn insert(&self, id: &str) -> bool {
        self.ids.write().await.insert(id.to_string())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.ids.read().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.ids.read().await.len()
    }
}
