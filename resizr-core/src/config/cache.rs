//! Cache configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root of the base-image tier
    /// Env: RESIZR_CACHE_DIR
    /// Default: "./cache"
    pub dir: PathBuf,

    /// Converted-image tier, relative to `dir`
    /// Default: "resized"
    pub converted_subdir: String,

    /// Entries kept in memory per tier
    /// Env: RESIZR_MCACHESIZE
    /// Default: 1
    pub memory_capacity: usize,

    /// Entries kept on disk per tier
    /// Env: RESIZR_FCACHESIZE
    /// Default: 2
    pub storage_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cache"),
            converted_subdir: "resized".to_string(),
            memory_capacity: 1,
            storage_capacity: 2,
        }
    }
}

impl CacheConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(dir) = env::var("RESIZR_CACHE_DIR") {
            self.dir = PathBuf::from(dir);
        }
        if let Ok(size) = env::var("RESIZR_MCACHESIZE") {
            if let Ok(s) = size.parse() {
                self.memory_capacity = s;
            }
        }
        if let Ok(size) = env::var("RESIZR_FCACHESIZE") {
            if let Ok(s) = size.parse() {
                self.storage_capacity = s;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.converted_subdir.is_empty() {
            anyhow::bail!("Invalid converted_subdir: cannot be empty");
        }
        Ok(())
    }

    pub fn base_dir(&self) -> PathBuf {
        self.dir.clone()
    }

    pub fn converted_dir(&self) -> PathBuf {
        self.dir.join(&self.converted_subdir)
    }
}
