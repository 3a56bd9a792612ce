//! Event dispatch for the worker.
//!
//! The host fires lifecycle events at the worker; here they become a dispatch
//! loop owned by a spawned task. Lifecycle events (install, activate, sync,
//! push) run inline, one at a time; fetch interceptions are spawned as
//! independent tasks so many can be in flight at once and a slow network
//! request never queues behind a cache hit. Each fetch task dies with the
//! runtime on teardown. Fetch events carry a oneshot reply slot; the other
//! events are fire-and-forget. A dropped reply receiver (client page closed
//! mid-fetch) is tolerated, the loop just moves on.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::http::{FetchRequest, NetworkClient};

use super::manager::{CacheWorker, FetchOutcome, InstallReport};

// ============================================================================
// Constants
// ============================================================================

/// Depth of the event queue. Enough to absorb a burst of concurrent fetch
/// interceptions from one page load without the host blocking.
const EVENT_QUEUE_DEPTH: usize = 64;

/// A lifecycle event delivered to the worker.
pub enum WorkerEvent {
    Install {
        reply: oneshot::Sender<InstallReport>,
    },
    Activate {
        reply: oneshot::Sender<Vec<String>>,
    },
    Fetch {
        request: FetchRequest,
        reply: oneshot::Sender<FetchOutcome>,
    },
    Sync {
        tag: String,
    },
    Push {
        payload: Vec<u8>,
    },
    NotificationClick {
        id: String,
    },
    Shutdown,
}

/// Clonable handle for delivering events to a running worker.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<WorkerEvent>,
}

impl WorkerHandle {
    /// Run the install phase, returning its report. `None` if the worker has
    /// already shut down.
    pub async fn install(&self) -> Option<InstallReport> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(WorkerEvent::Install { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Run the activate phase, returning the deleted partition names.
    pub async fn activate(&self) -> Option<Vec<String>> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(WorkerEvent::Activate { reply }).await.ok()?;
        rx.await.ok()
    }

    /// Intercept a request. A worker that is gone behaves like no worker at
    /// all: the request passes through.
    pub async fn fetch(&self, request: FetchRequest) -> FetchOutcome {
        let (reply, rx) = oneshot::channel();
        if self
            .tx
            .send(WorkerEvent::Fetch { request, reply })
            .await
            .is_err()
        {
            return FetchOutcome::PassThrough;
        }
        rx.await.unwrap_or(FetchOutcome::PassThrough)
    }

    pub async fn sync(&self, tag: impl Into<String>) {
        let _ = self.tx.send(WorkerEvent::Sync { tag: tag.into() }).await;
    }

    pub async fn push(&self, payload: Vec<u8>) {
        let _ = self.tx.send(WorkerEvent::Push { payload }).await;
    }

    pub async fn notification_click(&self, id: impl Into<String>) {
        let _ = self
            .tx
            .send(WorkerEvent::NotificationClick { id: id.into() })
            .await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(WorkerEvent::Shutdown).await;
    }
}

/// Spawn the dispatch loop for a worker, returning its handle and the task.
pub fn spawn_worker<N: NetworkClient + 'static>(
    worker: CacheWorker<N>,
) -> (WorkerHandle, tokio::task::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let task = tokio::spawn(run_worker(worker, rx));
    (WorkerHandle { tx }, task)
}

/// The dispatch loop. Exits when all handles are dropped or on Shutdown.
async fn run_worker<N: NetworkClient + 'static>(
    worker: CacheWorker<N>,
    mut rx: mpsc::Receiver<WorkerEvent>,
) {
    let worker = std::sync::Arc::new(worker);
    while let Some(event) = rx.recv().await {
        match event {
            WorkerEvent::Install { reply } => {
                let report = match worker.install().await {
                    Ok(report) => report,
                    Err(e) => {
                        warn!(error = %e, "Install failed");
                        InstallReport {
                            cached: Vec::new(),
                            failed: worker.config().asset_manifest.clone(),
                        }
                    }
                };
                let _ = reply.send(report);
            }
            WorkerEvent::Activate { reply } => {
                let deleted = match worker.activate().await {
                    Ok(deleted) => deleted,
                    Err(e) => {
                        warn!(error = %e, "Activate failed");
                        Vec::new()
                    }
                };
                let _ = reply.send(deleted);
            }
            WorkerEvent::Fetch { request, reply } => {
                // Each interception is its own task: concurrent fetches never
                // queue behind one another.
                let worker = std::sync::Arc::clone(&worker);
                tokio::spawn(async move {
                    let outcome = worker.handle_fetch(&request).await;
                    if reply.send(outcome).is_err() {
                        debug!(url = %request.url, "Fetch reply receiver dropped");
                    }
                });
            }
            WorkerEvent::Sync { tag } => worker.handle_sync(&tag).await,
            WorkerEvent::Push { payload } => worker.handle_push(&payload).await,
            WorkerEvent::NotificationClick { id } => {
                worker.handle_notification_click(&id).await;
            }
            WorkerEvent::Shutdown => {
                debug!("Worker shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::CacheStore;
    use crate::config::WorkerConfig;
    use crate::worker::notify::RecordingSink;
    use crate::worker::testutil::MockNetwork;

    const ORIGIN: &str = "https://play.example";

    fn spawn_fixture() -> (tempfile::TempDir, WorkerHandle, Arc<MockNetwork>) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path().join("cache")).unwrap();
        let network = Arc::new(MockNetwork::new());
        let config = WorkerConfig {
            origin: ORIGIN.to_string(),
            asset_manifest: vec!["/".to_string()],
            ..WorkerConfig::default()
        };
        let worker = CacheWorker::new(
            config,
            store,
            Arc::clone(&network),
            Arc::new(RecordingSink::default()),
        );
        let (handle, _task) = spawn_worker(worker);
        (tmp, handle, network)
    }

    #[tokio::test]
    async fn test_full_flow_through_dispatcher() {
        let (_tmp, handle, network) = spawn_fixture();
        network.route_ok(&format!("{}/", ORIGIN), b"<html>home</html>");

        let report = handle.install().await.unwrap();
        assert!(report.is_complete());
        handle.activate().await.unwrap();

        network.set_offline(true);
        let outcome = handle
            .fetch(FetchRequest::navigate(format!("{}/", ORIGIN)))
            .await;
        match outcome {
            FetchOutcome::Response(r) => assert_eq!(r.body, b"<html>home</html>"),
            other => panic!("expected cached response, got {:?}", other),
        }

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_fetch_after_shutdown_passes_through() {
        let (_tmp, handle, _network) = spawn_fixture();
        handle.shutdown().await;
        // Give the loop a chance to exit before sending.
        tokio::task::yield_now().await;

        let outcome = handle
            .fetch(FetchRequest::get(format!("{}/app.js", ORIGIN)))
            .await;
        assert_eq!(outcome, FetchOutcome::PassThrough);
    }

    #[tokio::test]
    async fn test_cached_fetch_completes_while_another_is_stalled() {
        let (_tmp, handle, network) = spawn_fixture();
        network.route_ok(&format!("{}/", ORIGIN), b"<html>home</html>");
        handle.install().await.unwrap();
        handle.activate().await.unwrap();

        let slow_url = format!("{}/slow.js", ORIGIN);
        network.route_ok(&slow_url, b"js");
        let gate = network.gate(&slow_url);

        let slow = tokio::spawn({
            let handle = handle.clone();
            let slow_url = slow_url.clone();
            async move { handle.fetch(FetchRequest::get(slow_url)).await }
        });
        // Let the stalled fetch reach the network before issuing the next one.
        tokio::task::yield_now().await;

        // The cache hit must resolve while the other fetch is still parked;
        // if interceptions were serialized this would hang on the gate.
        let outcome = handle
            .fetch(FetchRequest::get(format!("{}/", ORIGIN)))
            .await;
        match outcome {
            FetchOutcome::Response(r) => assert_eq!(r.body, b"<html>home</html>"),
            other => panic!("expected cached response, got {:?}", other),
        }

        gate.notify_one();
        match slow.await.unwrap() {
            FetchOutcome::Response(r) => assert_eq!(r.body, b"js"),
            other => panic!("expected slow response, got {:?}", other),
        }
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_fire_and_forget_events_do_not_block() {
        let (_tmp, handle, network) = spawn_fixture();
        network.route_ok(&format!("{}/", ORIGIN), b"x");
        handle.install().await.unwrap();
        handle.activate().await.unwrap();

        handle.sync("unknown-tag").await;
        handle.push(b"not-json".to_vec()).await;
        handle.notification_click("n1").await;
        handle.shutdown().await;
    }
}
