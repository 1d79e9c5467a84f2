//! Upstream image fetch

use super::headers::{forwardable_request_headers, HeaderSet};
use crate::error::{Error, Result};
use bytes::Bytes;
use http::HeaderMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("resizr/", env!("CARGO_PKG_VERSION"));

/// Body and sanitized headers of a successful upstream response
#[derive(Debug, Clone)]
pub struct Fetched {
    pub content: Bytes,
    pub headers: HeaderSet,
}

/// Prefix `https://` when the locator carries no http(s) scheme
pub fn upstream_url(locator: &str) -> String {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        locator.to_string()
    } else {
        format!("https://{}", locator)
    }
}

/// Pooled HTTP client bounded by a per-request timeout
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| Error::Upstream(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET `locator`, forwarding the permitted subset of `inbound` headers.
    ///
    /// Anything but a 200 is an [`Error::Upstream`].
    pub async fn fetch(&self, locator: &str, inbound: &HeaderMap) -> Result<Fetched> {
        let url = upstream_url(locator);
        log::debug!("fetching {}", url);

        let response = self
            .client
            .get(&url)
            .headers(forwardable_request_headers(inbound))
            .send()
            .await
            .map_err(|e| {
                log::warn!("fetch {} failed (timeout: {}): {}", url, e.is_timeout(), e);
                Error::Upstream(e.to_string())
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            log::warn!("fetch {} returned {}", url, status);
            return Err(Error::Upstream(format!("{} returned status {}", url, status.as_u16())));
        }

        let headers = HeaderSet::from_header_map(response.headers());
        let content = response
            .bytes()
            .await
            .map_err(|e| Error::Upstream(format!("reading body of {}: {}", url, e)))?;

        log::debug!("fetched {} ({} bytes)", url, content.len());
        Ok(Fetched { content, headers })
    }
}
