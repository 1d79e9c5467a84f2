//! Builder pattern for ResizrServer

use super::{load_error_image, ResizrServer};
use crate::cache::DurableCache;
use crate::config::ResizrConfig;
use crate::http::ResizeService;
use crate::imaging::{ImageProcessor, RasterProcessor};
use crate::pipeline::{ResizePipeline, SharedCache};
use crate::proxy::UpstreamClient;
use crate::server::Supervisor;
use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::Arc;

/// Builder for ResizrServer
pub struct ResizrServerBuilder {
    config: ResizrConfig,
    processor: Option<Arc<dyn ImageProcessor>>,
    error_image: Option<Bytes>,
}

impl Default for ResizrServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResizrServerBuilder {
    /// Create a new builder from `resizr.toml` and the environment, or defaults
    pub fn new() -> Self {
        Self::with_config(ResizrConfig::load().unwrap_or_default())
    }

    /// Create a builder with custom configuration
    pub fn with_config(config: ResizrConfig) -> Self {
        Self { config, processor: None, error_image: None }
    }

    // ========================================================================
    // SERVER CONFIGURATION
    // ========================================================================

    /// Set server port (overrides config file and env vars)
    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_restart_on_error(mut self, restart: bool) -> Self {
        self.config.server.restart_on_error = restart;
        self
    }

    /// Seconds in-flight requests get to finish once shutdown starts
    pub fn with_shutdown_timeout(mut self, seconds: u64) -> Self {
        self.config.server.shutdown_timeout = seconds;
        self
    }

    // ========================================================================
    // CACHE CONFIGURATION
    // ========================================================================

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache.dir = dir.into();
        self
    }

    pub fn with_memory_capacity(mut self, entries: usize) -> Self {
        self.config.cache.memory_capacity = entries;
        self
    }

    pub fn with_storage_capacity(mut self, entries: usize) -> Self {
        self.config.cache.storage_capacity = entries;
        self
    }

    // ========================================================================
    // IMAGING
    // ========================================================================

    /// Replace the default `image`-crate processor
    pub fn with_processor(mut self, processor: Arc<dyn ImageProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    /// Use these bytes as the error image instead of loading one from disk
    pub fn with_error_image_bytes(mut self, image: impl Into<Bytes>) -> Self {
        self.error_image = Some(image.into());
        self
    }

    pub fn with_error_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.server.error_image = Some(path.into());
        self
    }

    /// Open both cache tiers and wire pipeline, service and supervisor.
    ///
    /// Configuration is not validated here; the binary does that before
    /// building so that tests can listen on port 0.
    pub fn build(self) -> Result<ResizrServer> {
        let cache = &self.config.cache;

        let base = Arc::new(
            DurableCache::open(cache.memory_capacity, cache.storage_capacity, cache.base_dir())
                .with_context(|| format!("Failed to open cache {}", cache.base_dir().display()))?,
        );
        let converted = Arc::new(
            DurableCache::open(
                cache.memory_capacity,
                cache.storage_capacity,
                cache.converted_dir(),
            )
            .with_context(|| format!("Failed to open cache {}", cache.converted_dir().display()))?,
        );

        let processor = self.processor.unwrap_or_else(|| Arc::new(RasterProcessor::new()));
        let error_image = match self.error_image {
            Some(image) => image,
            None => load_error_image(self.config.server.error_image.as_deref(), &*processor)?,
        };

        let upstream = UpstreamClient::new(self.config.server.read_timeout())?;
        let base_shared: SharedCache = base.clone();
        let converted_shared: SharedCache = converted.clone();
        let pipeline = ResizePipeline::new(base_shared, converted_shared, upstream, processor);
        let service = Arc::new(ResizeService::new(pipeline, error_image, crate::VERSION));
        let supervisor = Supervisor::new(self.config.server.supervisor_options(), service);

        Ok(ResizrServer { config: self.config, base, converted, supervisor })
    }
}
