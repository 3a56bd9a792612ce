//! HTTP request/response model and network client.
//!
//! This module provides the `FetchRequest`/`FetchResponse` snapshot types the
//! worker operates on, and the `NetworkClient` trait with its reqwest-backed
//! implementation for talking to the origin server.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpClient, NetworkClient};
pub use error::FetchError;
pub use types::{FetchRequest, FetchResponse, Method, RequestMode, ResponseKind};
