//! Counters for poll cycles and record outcomes

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Running totals since process start
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub cycles: AtomicU64,
    pub fetch_failures: AtomicU64,
    pub records_fetched: AtomicU64,
    pub skipped_offline: AtomicU64,
    pub skipped_duplicate: AtomicU64,
    pub skipped_not_pending: AtomicU64,
    pub undeliverable: AtomicU64,
    pub dispatched: AtomicU64,
    pub exec_failures: AtomicU64,
    pub deletes_ok: AtomicU64,
    pub deletes_failed: AtomicU64,
}

/// Point-in-time copy of [`BridgeStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub fetch_failures: u64,
    pub records_fetched: u64,
    pub skipped_offline: u64,
    pub skipped_duplicate: u64,
    pub skipped_not_pending: u64,
    pub undeliverable: u64,
    pub dispatched: u64,
    pub exec_failures: u64,
    pub deletes_ok: u64,
    pub deletes_failed: u64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bump a counter by one
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            cycles: get(&self.cycles),
            fetch_failures: get(&self.fetch_failures),
            records_fetched: get(&self.records_fetched),
            skipped_offline: get(&self.skipped_offline),
            skipped_duplicate: get(&self.skipped_duplicate),
            skipped_not_pending: get(&self.skipped_not_pending),
            undeliverable: get(&self.undeliverable),
            dispatched: get(&self.dispatched),
            exec_failures: get(&self.exec_failures),
            deletes_ok: get(&self.deletes_ok),
            deletes_failed: get(&self.deletes_failed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cycles={} fetch_failures={} fetched={} dispatched={} exec_failures={} \
             skipped(offline={} duplicate={} not_pending={}) undeliverable={} deletes(ok={} failed={})",
            self.cycles,
            self.fetch_failures,
            self.records_fetched,
            self.dispatched,
            self.exec_failures,
            self.skipped_offline,
            self.skipped_duplicate,
            self.skipped_not_pending,
            self.undeliverable,
            self.deletes_ok,
            self.deletes_failed,
        )
    }
}
