//! Poll timer and per-cycle fetch + parse

use crate::dispatch::{BridgeStats, Ledger, MainTask};
use crate::remote::CommandStore;
use shopbridge_shared::parse_commands;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Records parsed from the response
    pub fetched: usize,
    /// Records handed to the main context
    pub forwarded: usize,
}

/// Fetches pending records on a timer and queues them for dispatch
pub struct Poller {
    store: Arc<dyn CommandStore>,
    ledger: Arc<Ledger>,
    stats: Arc<BridgeStats>,
    main_tx: mpsc::Sender<MainTask>,
    interval: Duration,
    initial_delay: Duration,
}

impl Poller {
    pub fn new(
        store: Arc<dyn CommandStore>,
        ledger: Arc<Ledger>,
        stats: Arc<BridgeStats>,
        main_tx: mpsc::Sender<MainTask>,
        interval: Duration,
        initial_delay: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            stats,
            main_tx,
            interval,
            initial_delay,
        }
    }

    /// Run one fetch + parse cycle.
    ///
    /// Fetch and parse failures end the cycle with nothing forwarded.
    pub async fn run_cycle(&self) -> CycleReport {
        BridgeStats::incr(&self.stats.cycles);

        let body = match self.store.fetch_pending().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Fetch failed: {}", e);
                BridgeStats::incr(&self.stats.fetch_failures);
                return CycleReport::default();
            }
        };

        let batch = match parse_commands(&body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Could not parse pending commands: {}", e);
                return CycleReport::default();
            }
        };
        if let Some(e) = &batch.damaged {
            warn!(
                "Pending commands body is damaged ({}), keeping {} complete record(s)",
                e,
                batch.records.len()
            );
        }
        let records = batch.records;

        let mut report = CycleReport {
            fetched: records.len(),
            forwarded: 0,
        };
        BridgeStats::add(&self.stats.records_fetched, records.len() as u64);

        for record in records {
            if self.ledger.contains(&record.id).await {
                debug!("Skipping {}: already dispatched", record.id);
                BridgeStats::incr(&self.stats.skipped_duplicate);
                continue;
            }
            if self.main_tx.send(MainTask::Dispatch(record)).await.is_err() {
                warn!("Main context is gone, dropping the rest of this cycle");
                break;
            }
            report.forwarded += 1;
        }

        if report.fetched > 0 {
            info!(
                "Poll found {} pending command(s), queued {}",
                report.fetched, report.forwarded
            );
        }
        report
    }

    /// Start the recurring timer
    pub fn start(self) -> PollerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.initial_delay, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Polling every {:?}", self.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        // A stop that lands mid-cycle takes effect on the next select
                        self.run_cycle().await;
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Polling stopped");
        });

        PollerHandle { stop_tx, task }
    }
}

/// Handle to a running poll timer
pub struct PollerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop scheduling cycles and wait for any cycle in flight to finish
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DispatchEngine, MainContext};
    use crate::remote::RemoteStore;
    use crate::testing::{FakeHost, MemoryStore};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poller(
        store: Arc<dyn CommandStore>,
        ledger: Arc<Ledger>,
        stats: Arc<BridgeStats>,
        interval: Duration,
    ) -> (Poller, mpsc::Receiver<MainTask>) {
        let (tx, rx) = mpsc::channel(16);
        let poller = Poller::new(store, ledger, stats, tx, interval, Duration::ZERO);
        (poller, rx)
    }

    #[tokio::test]
    async fn test_cycle_forwards_parsed_records() {
        let store = MemoryStore::with_body(
            r#"[{"id":"1","command":"say a","mc_username":"A"},{"id":"2","command":"say b","mc_username":"B"}]"#,
        );
        let stats = Arc::new(BridgeStats::new());
        let (poller, mut rx) = poller(store, Arc::new(Ledger::new()), stats.clone(), Duration::from_secs(15));

        let report = poller.run_cycle().await;
        assert_eq!(report, CycleReport { fetched: 2, forwarded: 2 });

        let mut ids = Vec::new();
        while let Ok(MainTask::Dispatch(record)) = rx.try_recv() {
            ids.push(record.id);
        }
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(stats.snapshot().records_fetched, 2);
    }

    #[tokio::test]
    async fn test_cycle_skips_ids_already_in_ledger() {
        let store = MemoryStore::with_body(
            r#"[{"id":"old","command":"say a","mc_username":"A"},{"id":"new","command":"say b","mc_username":"B"}]"#,
        );
        let ledger = Arc::new(Ledger::new());
        ledger.insert("old").await;
        let stats = Arc::new(BridgeStats::new());
        let (poller, mut rx) = poller(store, ledger, stats.clone(), Duration::from_secs(15));

        let report = poller.run_cycle().await;
        assert_eq!(report, CycleReport { fetched: 2, forwarded: 1 });
        match rx.try_recv() {
            Ok(MainTask::Dispatch(record)) => assert_eq!(record.id, "new"),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(stats.snapshot().skipped_duplicate, 1);
    }

    #[tokio::test]
    async fn test_malformed_body_yields_nothing() {
        let store = MemoryStore::with_body("<html>Bad Gateway</html>");
        let (poller, mut rx) = poller(
            store,
            Arc::new(Ledger::new()),
            Arc::new(BridgeStats::new()),
            Duration::from_secs(15),
        );

        assert_eq!(poller.run_cycle().await, CycleReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_damaged_tail_still_forwards_complete_records() {
        let store = MemoryStore::with_body(
            r#"[{"id":"a","command":"say a","mc_username":"A"},{"id":"b","command":"say b"]"#,
        );
        let (poller, mut rx) = poller(
            store,
            Arc::new(Ledger::new()),
            Arc::new(BridgeStats::new()),
            Duration::from_secs(15),
        );

        assert_eq!(poller.run_cycle().await, CycleReport { fetched: 1, forwarded: 1 });
        match rx.try_recv() {
            Ok(MainTask::Dispatch(record)) => assert_eq!(record.id, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_500_processes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/pending_commands"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let store = RemoteStore::new(server.uri(), "anon-key", Duration::from_secs(5), None)
            .expect("client");
        let stats = Arc::new(BridgeStats::new());
        let (poller, mut rx) = poller(
            Arc::new(store),
            Arc::new(Ledger::new()),
            stats.clone(),
            Duration::from_secs(15),
        );

        assert_eq!(poller.run_cycle().await, CycleReport::default());
        assert!(rx.try_recv().is_err());
        assert_eq!(stats.snapshot().fetch_failures, 1);
    }

    #[tokio::test]
    async fn test_end_to_end_delivery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/pending_commands"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"[{"id":"a1","command":"give {username} diamond","mc_username":"Alex","status":"pending"}]"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/pending_commands"))
            .and(query_param("id", "eq.a1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let store: Arc<dyn CommandStore> = Arc::new(
            RemoteStore::new(server.uri(), "anon-key", Duration::from_secs(5), None)
                .expect("client"),
        );
        let ledger = Arc::new(Ledger::new());
        let stats = Arc::new(BridgeStats::new());
        let host = FakeHost::with_online(&["Alex"]);

        let engine = DispatchEngine::new(ledger.clone(), store.clone(), stats.clone());
        let main = MainContext::spawn(Box::new(host.clone()), engine, 16);
        let poller = Poller::new(
            store,
            ledger.clone(),
            stats.clone(),
            main.sender(),
            Duration::from_secs(15),
            Duration::ZERO,
        );

        assert_eq!(poller.run_cycle().await.forwarded, 1);
        drop(poller);
        main.shutdown().await;

        assert_eq!(host.executed(), vec!["give Alex diamond"]);
        assert!(ledger.contains("a1").await);

        let mut deleted = false;
        for _ in 0..200 {
            let requests = server.received_requests().await.unwrap_or_default();
            if requests.iter().any(|r| r.method.as_str() == "DELETE") {
                deleted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(deleted, "no delete request issued");
    }

    #[tokio::test]
    async fn test_timer_polls_until_stopped() {
        let store = MemoryStore::with_body("[]");
        let (poller, _rx) = poller(
            store.clone(),
            Arc::new(Ledger::new()),
            Arc::new(BridgeStats::new()),
            Duration::from_millis(20),
        );

        let handle = poller.start();
        for _ in 0..100 {
            if store.fetch_count() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.stop().await;

        let after_stop = store.fetch_count();
        assert!(after_stop >= 2);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.fetch_count(), after_stop);
    }

    #[tokio::test]
    async fn test_fetch_failure_does_not_stop_timer() {
        let store = MemoryStore::with_body("[]");
        store.set_fail_fetch(true);
        let stats = Arc::new(BridgeStats::new());
        let (poller, _rx) = poller(
            store.clone(),
            Arc::new(Ledger::new()),
            stats.clone(),
            Duration::from_millis(20),
        );

        let handle = poller.start();
        for _ in 0..100 {
            if store.fetch_count() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.stop().await;

        assert!(store.fetch_count() >= 3);
        assert!(stats.snapshot().fetch_failures >= 3);
    }
}
