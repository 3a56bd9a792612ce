//! The offline cache worker.
//!
//! An event-driven manager that intermediates between the host's network stack
//! and the application's asset sets: it pre-populates the static partition at
//! install, cleans up stale partitions at activate, and decides per intercepted
//! request whether to serve from cache, go to the network, or fall back to the
//! offline document. Lifecycle events arrive through the dispatcher in
//! [`events`]; all handlers degrade gracefully and never propagate failures to
//! the host.

pub mod events;
pub mod lifecycle;
pub mod manager;
pub mod notify;
pub mod sync;

pub use events::{spawn_worker, WorkerEvent, WorkerHandle};
pub use lifecycle::WorkerPhase;
pub use manager::{CacheWorker, FetchOutcome, InstallReport};
pub use notify::{Notification, NotificationSink, PushPayload, RecordingSink};

#[cfg(test)]
pub(crate) mod testutil {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use crate::http::{FetchError, FetchRequest, FetchResponse, NetworkClient, ResponseKind};

    /// In-memory network with scriptable routes and an offline switch.
    /// Unrouted URLs behave like an unreachable origin. A gated URL parks its
    /// fetch until the test releases it.
    #[derive(Default)]
    pub struct MockNetwork {
        routes: Mutex<HashMap<String, FetchResponse>>,
        gates: Mutex<HashMap<String, Arc<Notify>>>,
        offline: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl MockNetwork {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn route(&self, url: &str, response: FetchResponse) {
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }

        /// Register a 200 same-origin response for `url`.
        pub fn route_ok(&self, url: &str, body: &[u8]) {
            let mut response = FetchResponse::new(200, body.to_vec());
            response.url = url.to_string();
            response
                .headers
                .push(("content-type".to_string(), "text/html".to_string()));
            self.route(url, response);
        }

        pub fn route_status(&self, url: &str, status: u16) {
            let mut response = FetchResponse::new(status, Vec::new());
            response.url = url.to_string();
            self.route(url, response);
        }

        pub fn route_cors(&self, url: &str, body: &[u8]) {
            let mut response = FetchResponse::new(200, body.to_vec());
            response.url = url.to_string();
            response.kind = ResponseKind::Cors;
            self.route(url, response);
        }

        /// Make fetches for `url` park until the returned handle is notified.
        pub fn gate(&self, url: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates
                .lock()
                .unwrap()
                .insert(url.to_string(), Arc::clone(&gate));
            gate
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn clear_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl NetworkClient for MockNetwork {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
            self.calls.lock().unwrap().push(request.url.clone());
            let gate = self.gates.lock().unwrap().get(&request.url).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if self.offline.load(Ordering::SeqCst) {
                return Err(FetchError::Offline);
            }
            self.routes
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .ok_or(FetchError::Offline)
        }
    }
}
