//! skycache - an offline-first HTTP response cache worker.
//!
//! skycache sits between a host application and its network stack. It keeps
//! two versioned cache partitions: a static one pre-populated from a fixed
//! asset manifest at install time, and a dynamic one populated lazily from
//! successful runtime fetches. Per intercepted request it decides whether to
//! serve from a partition, go to the network and opportunistically persist the
//! result, or fail over to a known-good fallback document. Background sync and
//! push notification events are handled through the same dispatcher.
//!
//! Everything degrades gracefully: worst case under total network loss is the
//! cached root document for navigations, and no response for sub-resources
//! never seen before.

pub mod cache;
pub mod config;
pub mod http;
pub mod worker;

pub use cache::{CacheStore, Partition};
pub use config::WorkerConfig;
pub use http::{FetchError, FetchRequest, FetchResponse, HttpClient, Method, NetworkClient};
pub use worker::{
    spawn_worker, CacheWorker, FetchOutcome, InstallReport, Notification, NotificationSink,
    WorkerEvent, WorkerHandle, WorkerPhase,
};
