//! Resizr Server - composition root
//!
//! Wires the two durable cache tiers (base images in `cache.dir`, resized
//! images in `cache.dir/<converted_subdir>`), the resize pipeline and the
//! supervisor from one [`ResizrConfig`].
//!
//! # Example
//!
//! ```no_run
//! use resizr_core::app::ResizrServer;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = ResizrServer::new()
//!     .with_port(9000)
//!     .with_cache_dir("./cache")
//!     .build()?;
//! server.serve(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use crate::cache::DurableCache;
use crate::config::ResizrConfig;
use crate::imaging::{self, ImageProcessor};
use crate::server::{ServerState, Supervisor};
use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub mod builder;

pub use builder::ResizrServerBuilder;

/// Searched, in order, when no error image is configured
pub const ERROR_IMAGE_CANDIDATES: [&str; 2] = ["error.png", "assets/error.png"];

/// Side of the generated placeholder error image
pub const PLACEHOLDER_SIZE: u32 = 64;

pub struct ResizrServer {
    config: ResizrConfig,
    base: Arc<DurableCache>,
    converted: Arc<DurableCache>,
    supervisor: Supervisor,
}

impl ResizrServer {
    /// Create a new server with configuration from `resizr.toml` and the environment
    pub fn new() -> ResizrServerBuilder {
        ResizrServerBuilder::new()
    }

    /// Create a new server with custom configuration
    pub fn with_config(config: ResizrConfig) -> ResizrServerBuilder {
        ResizrServerBuilder::with_config(config)
    }

    pub fn config(&self) -> &ResizrConfig {
        &self.config
    }

    pub fn base_cache(&self) -> &Arc<DurableCache> {
        &self.base
    }

    pub fn converted_cache(&self) -> &Arc<DurableCache> {
        &self.converted
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerState> {
        self.supervisor.subscribe()
    }

    /// Serve until `token` is cancelled, then flush both caches' pending deletions
    pub async fn serve(&self, token: CancellationToken) -> Result<()> {
        log::info!("🚀 resizr {} starting on {}", crate::VERSION, self.config.server.addr());
        log::info!(
            "   cache: {} (memory {} / storage {} entries per tier)",
            self.config.cache.dir.display(),
            self.config.cache.memory_capacity,
            self.config.cache.storage_capacity
        );

        let result = self.supervisor.run(token).await;

        let base = Arc::clone(&self.base);
        let converted = Arc::clone(&self.converted);
        let flushed = tokio::task::spawn_blocking(move || {
            base.shutdown();
            converted.shutdown();
        })
        .await;
        if let Err(e) = flushed {
            log::error!("cache shutdown failed: {}", e);
        }

        result.context("Server terminated with an error")
    }
}

/// Read the error image from `configured`, else from the default locations,
/// else generate a placeholder. A file that is not a decodable image is an error.
pub fn load_error_image(
    configured: Option<&Path>,
    processor: &dyn ImageProcessor,
) -> Result<Bytes> {
    let path = match configured {
        Some(path) => Some(path.to_path_buf()),
        None => ERROR_IMAGE_CANDIDATES
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
            .map(Path::to_path_buf),
    };

    let Some(path) = path else {
        log::warn!("no error image found, using a generated placeholder");
        return Ok(Bytes::from(imaging::placeholder(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)?));
    };

    let image = std::fs::read(&path)
        .with_context(|| format!("Failed to read error image {}", path.display()))?;
    processor
        .validate(&image)
        .with_context(|| format!("Error image {} is not a valid image", path.display()))?;

    log::info!("error image loaded from {}", path.display());
    Ok(Bytes::from(image))
}
