//! The offline cache manager: install, activate, fetch policy, sync, push.
//!
//! Every handler here degrades gracefully. An unhandled failure escaping a
//! fetch handler would break the page load outright, so each policy branch
//! terminates in a best-effort response, a fallback, or a logged no-op.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::http::{FetchRequest, FetchResponse, NetworkClient, ResponseKind};

use super::lifecycle::{PhaseError, WorkerPhase};
use super::notify::{Notification, NotificationSink, PushPayload};
use super::sync::sync_game_data;

/// What the worker decided for an intercepted request.
#[derive(Debug, PartialEq)]
pub enum FetchOutcome {
    /// Not intercepted; the host performs the request exactly as without the
    /// worker.
    PassThrough,
    /// The worker produced a response (from cache, network, or fallback).
    Response(FetchResponse),
    /// Offline with nothing cached: the host shows its own failure page.
    NoResponse,
}

/// Result of static-partition population at install.
#[derive(Debug, Default)]
pub struct InstallReport {
    pub cached: Vec<String>,
    pub failed: Vec<String>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// The worker itself: config, partition store, network, notification surface.
///
/// Fetch handlers run as independent concurrent tasks over a shared worker,
/// so the phase sits behind a lock; install and activate hold it only for the
/// transition itself.
pub struct CacheWorker<N> {
    config: WorkerConfig,
    store: CacheStore,
    network: N,
    notifications: Arc<dyn NotificationSink>,
    phase: RwLock<WorkerPhase>,
}

impl<N: NetworkClient> CacheWorker<N> {
    pub fn new(
        config: WorkerConfig,
        store: CacheStore,
        network: N,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            notifications,
            phase: RwLock::new(WorkerPhase::Parsed),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn phase(&self) -> WorkerPhase {
        *self.phase.read().unwrap()
    }

    fn set_phase(&self, next: WorkerPhase) -> Result<(), PhaseError> {
        self.phase.write().unwrap().transition(next)
    }

    /// Entry counts per current partition, for status reporting.
    pub fn partition_status(&self) -> Result<Vec<(String, usize)>> {
        let mut status = Vec::new();
        for name in [self.config.static_partition(), self.config.dynamic_partition()] {
            let partition = self.store.partition(&name)?;
            status.push((name, partition.len()));
        }
        Ok(status)
    }

    /// Install: populate the static partition from the asset manifest.
    ///
    /// Every asset fetch is isolated; one failing never aborts the others or
    /// the install. The worker finishes Installed regardless and is eligible
    /// for activation immediately (no waiting on old workers or open tabs).
    pub async fn install(&self) -> Result<InstallReport> {
        self.set_phase(WorkerPhase::Installing)?;
        info!(partition = %self.config.static_partition(), "Installing worker");

        let static_partition = self.store.partition(&self.config.static_partition())?;

        let results = join_all(self.config.asset_manifest.iter().map(|path| {
            let request = FetchRequest::get(self.config.url_for(path));
            let partition = &static_partition;
            let network = &self.network;
            async move {
                let outcome = match network.fetch(&request).await {
                    Ok(response) if response.ok() => partition
                        .put(&request, &response)
                        .map_err(|e| e.to_string()),
                    Ok(response) => Err(format!("status {}", response.status)),
                    Err(e) => Err(e.to_string()),
                };
                (path.clone(), outcome)
            }
        }))
        .await;

        let mut report = InstallReport::default();
        for (path, outcome) in results {
            match outcome {
                Ok(()) => report.cached.push(path),
                Err(reason) => {
                    warn!(path = %path, reason = %reason, "Failed to pre-cache asset");
                    report.failed.push(path);
                }
            }
        }

        self.set_phase(WorkerPhase::Installed)?;
        info!(
            cached = report.cached.len(),
            failed = report.failed.len(),
            "Install complete"
        );
        Ok(report)
    }

    /// Activate: delete every partition that is neither the current static
    /// nor current dynamic partition, then start intercepting immediately.
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.set_phase(WorkerPhase::Activating)?;

        let keep = [self.config.static_partition(), self.config.dynamic_partition()];
        let mut deleted = Vec::new();
        for name in self.store.partition_names()? {
            if keep.contains(&name) {
                continue;
            }
            match self.store.delete_partition(&name) {
                Ok(()) => {
                    info!(partition = %name, "Deleted stale partition");
                    deleted.push(name);
                }
                Err(e) => warn!(partition = %name, error = %e, "Failed to delete stale partition"),
            }
        }

        // Both current partitions exist from here on.
        for name in &keep {
            self.store.partition(name)?;
        }

        self.set_phase(WorkerPhase::Activated)?;
        info!(deleted = deleted.len(), "Worker activated, controlling clients");
        Ok(deleted)
    }

    /// Fetch interception. Never returns an error: every failure path ends in
    /// a fallback response or `NoResponse`.
    pub async fn handle_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        if !self.phase().can_intercept_fetch() {
            return FetchOutcome::PassThrough;
        }
        if !request.method.is_get() {
            return FetchOutcome::PassThrough;
        }
        if request.origin() != Some(self.config.origin.as_str()) {
            return FetchOutcome::PassThrough;
        }

        let path = request.path();
        if path.starts_with(&self.config.api_prefix) {
            self.fetch_api(request, path).await
        } else {
            self.fetch_asset(request).await
        }
    }

    /// API requests: sensitive ones bypass the cache entirely; public ones are
    /// network-first with the dynamic partition as the offline fallback.
    async fn fetch_api(&self, request: &FetchRequest, path: &str) -> FetchOutcome {
        let sensitive = request.header("authorization").is_some()
            || self
                .config
                .sensitive_segments
                .iter()
                .any(|segment| path.contains(segment.as_str()));

        if sensitive {
            return match self.network.fetch(request).await {
                Ok(response) => FetchOutcome::Response(response),
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Sensitive API fetch failed");
                    FetchOutcome::NoResponse
                }
            };
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                if response.ok() {
                    self.store_dynamic(request, &response);
                }
                FetchOutcome::Response(response)
            }
            Err(e) => {
                if e.is_unreachable() {
                    debug!(url = %request.url, "Origin unreachable, trying cache");
                } else {
                    warn!(url = %request.url, error = %e, "API fetch failed, trying cache");
                }
                match self.match_any(request) {
                    Some(cached) => FetchOutcome::Response(cached),
                    None => FetchOutcome::NoResponse,
                }
            }
        }
    }

    /// Non-API requests: cache-first, network on miss, fallback document for
    /// navigations when offline.
    async fn fetch_asset(&self, request: &FetchRequest) -> FetchOutcome {
        if let Some(cached) = self.match_any(request) {
            return FetchOutcome::Response(cached);
        }

        match self.network.fetch(request).await {
            Ok(response) => {
                // Non-200 and non-basic responses pass through uncached.
                if response.ok() && response.kind == ResponseKind::Basic {
                    self.store_dynamic(request, &response);
                }
                FetchOutcome::Response(response)
            }
            Err(e) => {
                if e.is_unreachable() {
                    debug!(url = %request.url, "Origin unreachable for asset fetch");
                } else {
                    warn!(url = %request.url, error = %e, "Asset fetch failed");
                }
                if request.is_navigation() {
                    let fallback =
                        FetchRequest::get(self.config.url_for(&self.config.fallback_path));
                    if let Some(document) = self.match_any(&fallback) {
                        debug!(url = %request.url, "Serving offline fallback document");
                        return FetchOutcome::Response(document);
                    }
                }
                FetchOutcome::NoResponse
            }
        }
    }

    /// Background sync: the recognized tag runs the game-data task; anything
    /// else is ignored. Task errors are logged, never rethrown.
    pub async fn handle_sync(&self, tag: &str) {
        if tag != self.config.sync_tag {
            debug!(tag, "Ignoring unrecognized sync tag");
            return;
        }
        if let Err(e) = sync_game_data(&self.config, &self.store, &self.network).await {
            warn!(error = %e, "Game-data sync failed");
        }
    }

    /// Push: JSON payloads with title/body become notifications; everything
    /// else is silently dropped.
    pub async fn handle_push(&self, payload: &[u8]) {
        let parsed: PushPayload = match serde_json::from_slice(payload) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Dropping malformed push payload");
                return;
            }
        };

        self.notifications
            .show(Notification {
                title: parsed.title,
                body: parsed.body,
                icon: self.config.notification_icon.clone(),
                badge: self.config.notification_badge.clone(),
                vibration: self.config.vibration_pattern.clone(),
                route: self.config.primary_route.clone(),
            })
            .await;
    }

    /// Notification tap: close it, then open or focus the primary route.
    pub async fn handle_notification_click(&self, id: &str) {
        self.notifications.close(id).await;
        self.notifications
            .open_or_focus(&self.config.url_for(&self.config.primary_route))
            .await;
    }

    /// Exact-identity lookup across the current partitions, static first.
    fn match_any(&self, request: &FetchRequest) -> Option<FetchResponse> {
        for name in [self.config.static_partition(), self.config.dynamic_partition()] {
            match self.store.partition(&name) {
                Ok(partition) => {
                    if let Some(response) = partition.get(request) {
                        return Some(response);
                    }
                }
                Err(e) => warn!(partition = %name, error = %e, "Failed to open partition"),
            }
        }
        None
    }

    /// Store a clone of a response into the dynamic partition. Store failures
    /// are logged and never affect the in-flight response.
    fn store_dynamic(&self, request: &FetchRequest, response: &FetchResponse) {
        match self.store.partition(&self.config.dynamic_partition()) {
            Ok(partition) => {
                if let Err(e) = partition.put(request, response) {
                    warn!(url = %request.url, error = %e, "Failed to cache response");
                }
            }
            Err(e) => warn!(error = %e, "Failed to open dynamic partition"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
