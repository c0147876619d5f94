//! Dispatch engine - decides, runs, and cleans up one record at a time

use super::ledger::Ledger;
use super::stats::BridgeStats;
use crate::host::{GameHost, HostError};
use crate::remote::CommandStore;
use shopbridge_shared::defaults;
use shopbridge_shared::record::substitute_placeholders;
use shopbridge_shared::{PendingCommand, RecordEvent, RecordLifecycle, TransitionResult};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Commands whose success is not worth announcing
const QUIET_COMMAND_PREFIX: &str = "tellraw";

/// Why a command did not run cleanly
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("game host error: {0}")]
    Host(#[from] HostError),

    #[error("game host rejected command: {command}")]
    Rejected { command: String },
}

/// What happened to a record handed to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Target user not connected; record stays pending
    SkippedOffline,
    /// Id already dispatched by this process
    SkippedDuplicate,
    /// Record no longer has status `pending`
    SkippedNotPending,
    /// No target user; removed without running
    Undeliverable,
    /// Command ran (or failed to) and deletion was scheduled
    Dispatched { success: bool },
}

/// Runs records against the game host.
///
/// Must only be driven from the main execution context. Deletes run on
/// their own tasks, tracked so shutdown can wait for them.
pub struct DispatchEngine {
    ledger: Arc<Ledger>,
    store: Arc<dyn CommandStore>,
    stats: Arc<BridgeStats>,
    deletes: Mutex<JoinSet<()>>,
    drain_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(ledger: Arc<Ledger>, store: Arc<dyn CommandStore>, stats: Arc<BridgeStats>) -> Self {
        Self {
            ledger,
            store,
            stats,
            deletes: Mutex::new(JoinSet::new()),
            drain_timeout: Duration::from_secs(defaults::DELETE_DRAIN_TIMEOUT_SECS),
        }
    }

    /// Override how long [`Self::finish_deletes`] waits for deletes in flight
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Wait for deletes still in flight, up to the drain timeout.
    ///
    /// Returns how many were abandoned; those records stay pending remotely.
    pub async fn finish_deletes(&self) -> usize {
        let mut deletes = std::mem::take(&mut *self.deletes.lock().await);
        if deletes.is_empty() {
            return 0;
        }

        debug!("Waiting for {} delete(s) in flight", deletes.len());
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while deletes.join_next().await.is_some() {}
        })
        .await;

        match drained {
            Ok(()) => 0,
            Err(_) => {
                warn!(
                    "Abandoning {} delete(s) after {:?}; those orders stay pending",
                    deletes.len(),
                    self.drain_timeout
                );
                deletes.len()
            }
        }
    }

    /// Decide on and dispatch one record
    pub async fn dispatch(&self, host: &mut dyn GameHost, record: PendingCommand) -> DispatchOutcome {
        let mut lifecycle = RecordLifecycle::new(&record.id);

        if !record.is_pending() {
            debug!(
                "Skipping {}: status is {:?}",
                record.id,
                record.status.as_deref().unwrap_or_default()
            );
            advance(&mut lifecycle, RecordEvent::NotPending);
            BridgeStats::incr(&self.stats.skipped_not_pending);
            return DispatchOutcome::SkippedNotPending;
        }

        let Some(user) = record.target_user.as_deref() else {
            warn!("Record {} has no target user, removing it", record.id);
            advance(&mut lifecycle, RecordEvent::MissingUser);
            BridgeStats::incr(&self.stats.undeliverable);
            self.schedule_delete(lifecycle).await;
            return DispatchOutcome::Undeliverable;
        };

        match host.is_online(user).await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Skipping {}: {} is offline", record.id, user);
                advance(&mut lifecycle, RecordEvent::UserOffline);
                BridgeStats::incr(&self.stats.skipped_offline);
                return DispatchOutcome::SkippedOffline;
            }
            Err(e) => {
                debug!("Skipping {}: player lookup failed: {}", record.id, e);
                advance(&mut lifecycle, RecordEvent::UserOffline);
                BridgeStats::incr(&self.stats.skipped_offline);
                return DispatchOutcome::SkippedOffline;
            }
        }

        if !self.ledger.insert(&record.id).await {
            debug!("Skipping {}: already dispatched", record.id);
            advance(&mut lifecycle, RecordEvent::DuplicateId);
            BridgeStats::incr(&self.stats.skipped_duplicate);
            return DispatchOutcome::SkippedDuplicate;
        }

        let command = substitute_placeholders(&record.command, user);
        let success = match execute(host, &command).await {
            Ok(()) => {
                if !command.starts_with(QUIET_COMMAND_PREFIX) {
                    info!("Delivered order {} to {}", record.id, user);
                }
                true
            }
            Err(e) => {
                warn!("Command for order {} failed: {}", record.id, e);
                BridgeStats::incr(&self.stats.exec_failures);
                false
            }
        };
        BridgeStats::incr(&self.stats.dispatched);
        advance(&mut lifecycle, RecordEvent::Executed { success });

        self.schedule_delete(lifecycle).await;
        DispatchOutcome::Dispatched { success }
    }

    /// Remove the record on a background task; failures are only counted
    async fn schedule_delete(&self, mut lifecycle: RecordLifecycle) {
        let store = self.store.clone();
        let stats = self.stats.clone();

        let mut deletes = self.deletes.lock().await;
        // Reap finished deletes so the set only holds work in flight
        while deletes.try_join_next().is_some() {}

        deletes.spawn(async move {
            let event = match store.delete(lifecycle.record_id()).await {
                Ok(()) => {
                    BridgeStats::incr(&stats.deletes_ok);
                    RecordEvent::DeleteSucceeded
                }
                Err(e) => {
                    debug!("Delete of {} failed: {}", lifecycle.record_id(), e);
                    BridgeStats::incr(&stats.deletes_failed);
                    RecordEvent::DeleteFailed
                }
            };
            advance(&mut lifecycle, event);
        });
    }
}

async fn execute(host: &mut dyn GameHost, command: &str) -> Result<(), DispatchError> {
    if host.dispatch_command(command).await? {
        Ok(())
    } else {
        Err(DispatchError::Rejected {
            command: command.to_string(),
        })
    }
}

fn advance(lifecycle: &mut RecordLifecycle, event: RecordEvent) {
    match lifecycle.process_event(event) {
        TransitionResult::Success(state) => {
            debug!("Record {} -> {:?}", lifecycle.record_id(), state);
        }
        TransitionResult::Invalid { from, event } => {
            warn!(
                "Record {}: invalid transition from {:?} on {:?}",
                lifecycle.record_id(),
                from,
                event
            );
        }
    }
}
