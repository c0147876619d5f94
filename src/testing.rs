//! In-memory fakes for the store and host seams

use crate::host::{GameHost, HostError};
use crate::remote::{CommandStore, StoreError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Store serving a fixed response body and recording delete attempts
#[derive(Default)]
pub struct MemoryStore {
    body: Mutex<String>,
    fail_fetch: AtomicBool,
    fail_delete: AtomicBool,
    fetches: AtomicUsize,
    delete_attempts: Mutex<Vec<String>>,
    delete_delay: Mutex<Duration>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_body(body: &str) -> Arc<Self> {
        let store = Self::default();
        *store.body.lock().unwrap() = body.to_string();
        Arc::new(store)
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    /// Make every delete take `delay` before it completes
    pub fn set_delete_delay(&self, delay: Duration) {
        *self.delete_delay.lock().unwrap() = delay;
    }

    /// Ids whose delete completed successfully
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().unwrap().clone()
    }

    /// Wait until at least `n` deletes were attempted
    pub async fn wait_for_deletes(&self, n: usize) -> Vec<String> {
        for _ in 0..200 {
            let attempts = self.delete_attempts();
            if attempts.len() >= n {
                return attempts;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.delete_attempts()
    }
}

#[async_trait]
impl CommandStore for MemoryStore {
    async fn fetch_pending(&self) -> Result<String, StoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(StoreError::RemoteFetch {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }
        Ok(self.body.lock().unwrap().clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.delete_attempts.lock().unwrap().push(id.to_string());
        let delay = *self.delete_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::RemoteDelete {
                status: 503,
                message: "Service Unavailable".into(),
            });
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// How the fake host answers command dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    #[default]
    Accept,
    Reject,
    Fail,
}

/// Scripted game host; clones share state
#[derive(Clone, Default)]
pub struct FakeHost {
    online: Arc<Mutex<HashSet<String>>>,
    executed: Arc<Mutex<Vec<String>>>,
    mode: Arc<Mutex<ExecMode>>,
}

impl FakeHost {
    pub fn with_online(users: &[&str]) -> Self {
        let host = Self::default();
        for user in users {
            host.set_online(user);
        }
        host
    }

    pub fn set_online(&self, user: &str) {
        self.online.lock().unwrap().insert(user.to_string());
    }

    pub fn set_mode(&self, mode: ExecMode) {
        *self.mode.lock().unwrap() = mode;
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl GameHost for FakeHost {
    async fn is_online(&mut self, user: &str) -> Result<bool, HostError> {
        Ok(self.online.lock().unwrap().contains(user))
    }

    async fn dispatch_command(&mut self, command: &str) -> Result<bool, HostError> {
        self.executed.lock().unwrap().push(command.to_string());
        match *self.mode.lock().unwrap() {
            ExecMode::Accept => Ok(true),
            ExecMode::Reject => Ok(false),
            ExecMode::Fail => Err(HostError::Closed),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
