//! Network client trait and the reqwest-backed implementation.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::debug;

use super::error::FetchError;
use super::types::{origin_of, FetchRequest, FetchResponse, Method, ResponseKind};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow origin responses while failing fast enough that offline
/// fallback still feels responsive.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// The worker's view of the network. Implementations suspend at the network
/// call; the worker imposes no timeout of its own beyond the client's.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

#[async_trait]
impl<N: NetworkClient + ?Sized> NetworkClient for std::sync::Arc<N> {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        (**self).fetch(request).await
    }
}

/// Network client backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    fn to_reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }

    fn build_headers(request: &FetchRequest) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &request.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.append(header_name, header_value);
        }
        Ok(headers)
    }
}

#[async_trait]
impl NetworkClient for HttpClient {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.origin().is_none() {
            return Err(FetchError::InvalidUrl(request.url.clone()));
        }

        let response = self
            .client
            .request(Self::to_reqwest_method(request.method), &request.url)
            .headers(Self::build_headers(request)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        let mut headers = Vec::with_capacity(response.headers().len());
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(v) => headers.push((name.to_string(), v.to_string())),
                Err(_) => debug!(header = %name, "Skipping non-UTF8 response header"),
            }
        }

        // Same-origin responses are basic; anything that landed on another
        // origin (redirects included) is treated as CORS.
        let kind = if origin_of(&final_url) == request.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        };

        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
            url: final_url,
            kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_headers_rejects_invalid_values() {
        let req = FetchRequest::get("https://example.com/")
            .with_header("x-token", "line\nbreak");
        assert!(matches!(
            HttpClient::build_headers(&req),
            Err(FetchError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_build_headers_passes_valid_values() {
        let req = FetchRequest::get("https://example.com/")
            .with_header("Authorization", "Bearer abc")
            .with_header("Accept", "application/json");
        let headers = HttpClient::build_headers(&req).unwrap();
        assert_eq!(headers.len(), 2);
    }
}
