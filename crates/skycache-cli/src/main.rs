//! skycache CLI - drive the offline cache worker from the command line.
//!
//! `skycache install` populates the static partition against the configured
//! origin and activates the worker (deleting stale partitions). `skycache
//! fetch <path>` replays a request through the worker's fetch policy.
//! `skycache status` reports what the partitions currently hold.

use std::io;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skycache_core::{
    spawn_worker, CacheStore, CacheWorker, FetchOutcome, FetchRequest, HttpClient, Notification,
    NotificationSink, WorkerConfig,
};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Notification surface for a headless CLI: log instead of display.
struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn show(&self, notification: Notification) {
        info!(title = %notification.title, body = %notification.body, "Notification shown");
    }

    async fn close(&self, id: &str) {
        info!(id, "Notification closed");
    }

    async fn open_or_focus(&self, url: &str) {
        info!(url, "Would open or focus client");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    match args.get(1).map(String::as_str) {
        Some("install") => cmd_install().await,
        Some("fetch") => {
            let path = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Usage: skycache fetch <path> [--navigate]"))?;
            let navigate = args.iter().any(|a| a == "--navigate");
            cmd_fetch(path, navigate).await
        }
        Some("push") => {
            let payload = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("Usage: skycache push <json>"))?;
            cmd_push(payload).await
        }
        Some("status") => cmd_status(),
        _ => {
            eprintln!("skycache - offline cache worker");
            eprintln!();
            eprintln!("Usage:");
            eprintln!("  skycache install              populate static partition, activate");
            eprintln!("  skycache fetch <path> [--navigate]");
            eprintln!("                                replay a request through the worker");
            eprintln!("  skycache push <json>          deliver a push payload");
            eprintln!("  skycache status               show partition contents");
            Ok(())
        }
    }
}

fn build_worker() -> Result<CacheWorker<HttpClient>> {
    let config = WorkerConfig::load()?;
    let store = CacheStore::new(WorkerConfig::cache_dir()?)?;
    let network = HttpClient::new()?;
    Ok(CacheWorker::new(config, store, network, Arc::new(LogSink)))
}

async fn cmd_install() -> Result<()> {
    let worker = build_worker()?;
    let origin = worker.config().origin.clone();
    let (handle, task) = spawn_worker(worker);

    eprintln!("Installing against {}...", origin);
    let report = handle
        .install()
        .await
        .ok_or_else(|| anyhow::anyhow!("Worker exited during install"))?;
    for path in &report.cached {
        eprintln!("  cached {}", path);
    }
    for path in &report.failed {
        eprintln!("  FAILED {}", path);
    }

    let deleted = handle
        .activate()
        .await
        .ok_or_else(|| anyhow::anyhow!("Worker exited during activate"))?;
    for name in &deleted {
        eprintln!("  deleted stale partition {}", name);
    }

    eprintln!(
        "Done: {} cached, {} failed{}",
        report.cached.len(),
        report.failed.len(),
        if report.is_complete() { "" } else { " (partial install accepted)" }
    );

    handle.shutdown().await;
    task.await?;
    Ok(())
}

async fn cmd_fetch(path: &str, navigate: bool) -> Result<()> {
    let worker = build_worker()?;
    let url = worker.config().url_for(path);
    let (handle, task) = spawn_worker(worker);

    // A fresh worker process installs and activates before it intercepts,
    // exactly as it would on registration.
    let _ = handle.install().await;
    let _ = handle.activate().await;

    let request = if navigate {
        FetchRequest::navigate(&url)
    } else {
        FetchRequest::get(&url)
    };

    match handle.fetch(request).await {
        FetchOutcome::Response(response) => {
            eprintln!(
                "{} -> {} ({} bytes, {:?})",
                url,
                response.status,
                response.body.len(),
                response.kind
            );
        }
        FetchOutcome::PassThrough => eprintln!("{} -> pass-through (not intercepted)", url),
        FetchOutcome::NoResponse => eprintln!("{} -> no response (offline, nothing cached)", url),
    }

    handle.shutdown().await;
    task.await?;
    Ok(())
}

async fn cmd_push(payload: &str) -> Result<()> {
    let worker = build_worker()?;
    worker.handle_push(payload.as_bytes()).await;
    Ok(())
}

fn cmd_status() -> Result<()> {
    let config = WorkerConfig::load()?;
    let store = CacheStore::new(WorkerConfig::cache_dir()?)?;

    for name in store.partition_names()? {
        let partition = store.partition(&name)?;
        let current = name == config.static_partition() || name == config.dynamic_partition();
        eprintln!(
            "{} ({} entries{})",
            name,
            partition.len(),
            if current { "" } else { ", stale" }
        );
        for url in partition.keys()? {
            eprintln!("  {}", url);
        }
    }
    Ok(())
}
