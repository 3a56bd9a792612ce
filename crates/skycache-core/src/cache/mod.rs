//! Persistent response cache, organized into named partitions.
//!
//! Two partitions exist at any deployment: a static partition pre-populated at
//! install from the asset manifest, and a dynamic partition populated lazily
//! from successful runtime fetches. Partition names embed the deploy version
//! token; bumping the token is the sole invalidation mechanism.

pub mod store;

pub use store::{CacheStore, Partition};
