//! Background game-data synchronization.
//!
//! Selected by the sync-tag contract: when the host signals the recognized
//! tag, the worker refreshes the public game-data endpoints into the dynamic
//! partition so the next offline session sees recent data. Per-path failures
//! are logged and skipped; the task itself never fails the worker.

use anyhow::Result;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::config::WorkerConfig;
use crate::http::{FetchRequest, NetworkClient};

/// Public game-data endpoints refreshed by a sync pass. These sit under the
/// API prefix but carry no sensitive segment, so caching them is allowed.
const GAME_DATA_PATHS: &[&str] = &["/api/game/rounds", "/api/game/leaderboard", "/api/settings"];

/// Refresh game data into the dynamic partition. Returns how many endpoints
/// were refreshed; individual failures only reduce the count.
pub async fn sync_game_data<N: NetworkClient>(
    config: &WorkerConfig,
    store: &CacheStore,
    network: &N,
) -> Result<usize> {
    let dynamic = store.partition(&config.dynamic_partition())?;

    let results = join_all(GAME_DATA_PATHS.iter().copied().map(|path| {
        let request = FetchRequest::get(config.url_for(path));
        async move {
            match network.fetch(&request).await {
                Ok(response) if response.ok() => Some((request, response)),
                Ok(response) => {
                    debug!(path, status = response.status, "Skipping non-200 sync response");
                    None
                }
                Err(e) => {
                    warn!(path, error = %e, "Game-data sync fetch failed");
                    None
                }
            }
        }
    }))
    .await;

    let mut refreshed = 0;
    for (request, response) in results.into_iter().flatten() {
        match dynamic.put(&request, &response) {
            Ok(()) => refreshed += 1,
            Err(e) => warn!(url = %request.url, error = %e, "Failed to store synced game data"),
        }
    }

    debug!(refreshed, total = GAME_DATA_PATHS.len(), "Game-data sync finished");
    Ok(refreshed)
}
