//! Main execution context
//!
//! The game host is not safe to touch from arbitrary tasks. Every
//! player lookup and command run happens on one task that owns the host
//! and drains a queue of work in submission order.

use super::engine::{DispatchEngine, DispatchOutcome};
use crate::host::GameHost;
use shopbridge_shared::PendingCommand;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Work submitted to the main context
#[derive(Debug)]
pub enum MainTask {
    /// Run one fetched record through the dispatch engine
    Dispatch(PendingCommand),
    /// Finish queued work and exit
    Shutdown,
}

/// Owner of the game host
pub struct MainContext;

impl MainContext {
    /// Spawn the main context task. Returns the handle used to submit work.
    pub fn spawn(
        mut host: Box<dyn GameHost>,
        engine: DispatchEngine,
        capacity: usize,
    ) -> MainContextHandle {
        let (tx, mut rx) = mpsc::channel::<MainTask>(capacity);

        let task = tokio::spawn(async move {
            info!("Main context started ({} host)", host.name());
            let mut handled = 0u64;

            while let Some(task) = rx.recv().await {
                match task {
                    MainTask::Dispatch(record) => {
                        let id = record.id.clone();
                        let outcome = engine.dispatch(host.as_mut(), record).await;
                        debug!("Record {}: {:?}", id, outcome);
                        if matches!(outcome, DispatchOutcome::Dispatched { .. }) {
                            handled += 1;
                        }
                    }
                    MainTask::Shutdown => break,
                }
            }

            engine.finish_deletes().await;
            info!("Main context stopped after {} dispatches", handled);
        });

        MainContextHandle { tx, task }
    }
}

/// Handle to a running main context
pub struct MainContextHandle {
    tx: mpsc::Sender<MainTask>,
    task: JoinHandle<()>,
}

impl MainContextHandle {
    /// Sender for submitting work
    pub fn sender(&self) -> mpsc::Sender<MainTask> {
        self.tx.clone()
    }

    /// Drain queued work and pending deletes, then stop
    pub async fn shutdown(self) {
        let _ = self.tx.send(MainTask::Shutdown).await;
        let _ = self.task.await;
    }
}
