//! Configuration system for resizr
//!
//! One [`ResizrConfig`] is built at process start and handed to the
//! composition root; nothing reads configuration from globals afterwards.
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Command line flags** - applied by the binary
//! 2. **Environment Variables** (`RESIZR_*`) - override file config
//! 3. **Config File** (TOML) - override defaults
//! 4. **Defaults** - lowest priority
//!
//! # Example
//!
//! ```no_run
//! use resizr_core::config::ResizrConfig;
//!
//! let config = ResizrConfig::load_from("resizr.toml")?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod cache;
pub mod logging;
pub mod server;

pub use cache::CacheConfig;
pub use logging::LoggingConfig;
pub use server::ServerConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete resizr configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResizrConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl ResizrConfig {
    /// Load configuration from `resizr.toml` in the working directory, if present
    pub fn load() -> Result<Self> {
        Self::load_from("resizr.toml")
    }

    /// Defaults, then `path` if it exists, then environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.cache.merge(other.cache);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.cache.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.server.validate().context("[server]")?;
        self.cache.validate().context("[cache]")?;
        self.logging.validate().context("[logging]")?;
        Ok(())
    }
}
