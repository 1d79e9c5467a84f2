//! Cache-aside resize pipeline
//!
//! converted cache -> base cache -> upstream fetch -> resize -> respond.
//! Cache and pixel work may block, so it runs on tokio's blocking pool.

use crate::cache::{converted_uri, Cache, CacheItem};
use crate::error::{Error, Result};
use crate::imaging::{sniff, ImageProcessor, FILL};
use crate::proxy::{HeaderSet, UpstreamClient};
use bytes::Bytes;
use http::HeaderMap;
use std::sync::Arc;

pub type SharedCache = Arc<dyn Cache<String, CacheItem>>;

/// One parsed `/:operation/:width/:height/*url` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeRequest {
    pub operation: String,
    pub width: u32,
    pub height: u32,
    /// Upstream locator exactly as requested, used as the base cache key
    pub source_url: String,
}

impl ResizeRequest {
    pub fn crop(&self) -> bool {
        self.operation == FILL
    }

    pub fn converted_uri(&self) -> String {
        converted_uri(self.width, self.height, &self.source_url)
    }
}

/// Image ready to be served
#[derive(Debug, Clone)]
pub struct Rendered {
    pub content: Bytes,
    pub headers: HeaderSet,
    /// Sniffed from `content`, never taken from upstream
    pub content_type: &'static str,
}

impl From<CacheItem> for Rendered {
    fn from(item: CacheItem) -> Self {
        let content_type = sniff(&item.content);
        Self { content: item.content, headers: item.headers, content_type }
    }
}

pub struct ResizePipeline {
    base: SharedCache,
    converted: SharedCache,
    upstream: UpstreamClient,
    processor: Arc<dyn ImageProcessor>,
}

impl ResizePipeline {
    pub fn new(
        base: SharedCache,
        converted: SharedCache,
        upstream: UpstreamClient,
        processor: Arc<dyn ImageProcessor>,
    ) -> Self {
        Self { base, converted, upstream, processor }
    }

    pub fn processor(&self) -> &Arc<dyn ImageProcessor> {
        &self.processor
    }

    /// Resolve `request`, forwarding the allowed part of `inbound` upstream
    pub async fn process(&self, request: &ResizeRequest, inbound: &HeaderMap) -> Result<Rendered> {
        let converted_key = request.converted_uri();

        if let Some(item) = Self::lookup(&self.converted, converted_key.clone()).await {
            log::debug!("converted cache hit for {}", converted_key);
            return Ok(item.into());
        }

        let original = match Self::lookup(&self.base, request.source_url.clone()).await {
            Some(item) => {
                log::debug!("base cache hit for {}", request.source_url);
                item
            }
            None => self.fetch_original(request, inbound).await?,
        };

        let processor = Arc::clone(&self.processor);
        let source = original.content.clone();
        let (width, height, crop) = (request.width, request.height, request.crop());
        let resized =
            tokio::task::spawn_blocking(move || processor.resize(&source, width, height, crop))
                .await
                .map_err(|e| Error::Resize(e.to_string()))??;

        let item = CacheItem::new(resized, original.headers);
        Self::store(&self.converted, converted_key.clone(), item.clone()).await;
        log::debug!("saved converted image {}", converted_key);

        Ok(item.into())
    }

    async fn fetch_original(
        &self,
        request: &ResizeRequest,
        inbound: &HeaderMap,
    ) -> Result<CacheItem> {
        let fetched = self.upstream.fetch(&request.source_url, inbound).await?;

        self.processor.validate(&fetched.content).map_err(|e| match e {
            Error::Decode(reason) => {
                Error::Decode(format!("invalid image at {}: {}", request.source_url, reason))
            }
            other => other,
        })?;

        let item = CacheItem::new(fetched.content, fetched.headers);
        Self::store(&self.base, request.source_url.clone(), item.clone()).await;
        log::debug!("loaded base image {} from upstream", request.source_url);
        Ok(item)
    }

    async fn lookup(cache: &SharedCache, key: String) -> Option<CacheItem> {
        let cache = Arc::clone(cache);
        match tokio::task::spawn_blocking(move || cache.get(&key)).await {
            Ok(item) => item,
            Err(e) => {
                log::error!("cache lookup aborted: {}", e);
                None
            }
        }
    }

    async fn store(cache: &SharedCache, key: String, item: CacheItem) {
        let cache = Arc::clone(cache);
        if let Err(e) = tokio::task::spawn_blocking(move || cache.set(key, item)).await {
            log::error!("cache store aborted: {}", e);
        }
    }
}
