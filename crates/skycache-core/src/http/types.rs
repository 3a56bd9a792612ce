//! Request and response snapshot types.
//!
//! Responses are plain value types (status, headers, body bytes) so they can be
//! cloned into the cache store and compared byte-for-byte in tests.

use serde::{Deserialize, Serialize};

/// HTTP methods the worker distinguishes. Only GET is ever cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl Method {
    pub fn is_get(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a request is a top-level navigation or a subresource load.
/// Navigations are the only requests eligible for the fallback document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    Subresource,
}

/// A request observed by the worker.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub mode: RequestMode,
}

impl FetchRequest {
    /// A plain GET subresource request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            mode: RequestMode::Subresource,
        }
    }

    /// A top-level navigation request.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup, first match wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The `scheme://host[:port]` portion of the URL, if it is absolute.
    pub fn origin(&self) -> Option<&str> {
        origin_of(&self.url)
    }

    /// The path portion of the URL ("/" when the URL has none).
    pub fn path(&self) -> &str {
        path_of(&self.url)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Response classification, mirroring the platform's response types.
/// Only `Basic` (same-origin) responses are eligible for opportunistic caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
}

/// A response snapshot: everything needed to replay it later from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub url: String,
    pub kind: ResponseKind,
}

impl FetchResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
            url: String::new(),
            kind: ResponseKind::Basic,
        }
    }

    /// Cacheable success per the worker's policy (exactly 200, not the 2xx range).
    pub fn ok(&self) -> bool {
        self.status == 200
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Extract `scheme://host[:port]` from an absolute URL, without a URL parser.
pub(crate) fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    if rest.is_empty() {
        return None;
    }
    let host_end = rest
        .find(['/', '?', '#'])
        .map(|i| scheme_end + 3 + i)
        .unwrap_or(url.len());
    Some(&url[..host_end])
}

/// Extract the path from an absolute URL ("/" when absent). Relative URLs are
/// returned as-is up to any query string.
pub(crate) fn path_of(url: &str) -> &str {
    let after_origin = match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find(['/', '?', '#']) {
                Some(i) if rest.as_bytes()[i] == b'/' => &rest[i..],
                _ => "/",
            }
        }
        None => url,
    };
    match after_origin.find(['?', '#']) {
        Some(i) => &after_origin[..i],
        None => after_origin,
    }
}
