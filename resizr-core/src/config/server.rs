//! Server configuration

use crate::server::SupervisorOptions;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening address
    /// Env: RESIZR_ADDR
    /// Default: "0.0.0.0"
    pub host: String,

    /// Listening port
    /// Env: RESIZR_PORT
    /// Default: 9000
    pub port: u16,

    /// Seconds allowed for reading a request, also bounds upstream fetches
    /// Env: RESIZR_READ_TIMEOUT
    /// Default: 30
    pub read_timeout: u64,

    /// Seconds in-flight requests get to finish on shutdown
    /// Env: RESIZR_SHUTDOWN_TIMEOUT
    /// Default: 60
    pub shutdown_timeout: u64,

    /// Start the listener again after it fails
    /// Env: RESIZR_RESTART_ON_ERROR
    /// Default: true
    pub restart_on_error: bool,

    /// Image served (resized) when a request fails
    /// Env: RESIZR_ERROR_IMAGE
    /// Default: None (search ./error.png, ./assets/error.png)
    pub error_image: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            read_timeout: 30,
            shutdown_timeout: 60,
            restart_on_error: true,
            error_image: None,
        }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.host = other.host;
        self.port = other.port;
        self.read_timeout = other.read_timeout;
        self.shutdown_timeout = other.shutdown_timeout;
        self.restart_on_error = other.restart_on_error;
        if other.error_image.is_some() {
            self.error_image = other.error_image;
        }
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        if let Ok(host) = env::var("RESIZR_ADDR") {
            self.host = host;
        }

        if let Ok(port) = env::var("RESIZR_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Ok(timeout) = env::var("RESIZR_READ_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.read_timeout = t;
            }
        }

        if let Ok(timeout) = env::var("RESIZR_SHUTDOWN_TIMEOUT") {
            if let Ok(t) = timeout.parse() {
                self.shutdown_timeout = t;
            }
        }

        if let Ok(restart) = env::var("RESIZR_RESTART_ON_ERROR") {
            self.restart_on_error = restart.parse().unwrap_or(true);
        }

        if let Ok(path) = env::var("RESIZR_ERROR_IMAGE") {
            self.error_image = Some(PathBuf::from(path));
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Invalid port: port must be between 1 and 65535");
        }

        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        if self.read_timeout == 0 {
            bail!("Invalid read_timeout: must be greater than 0");
        }

        if self.shutdown_timeout == 0 {
            bail!("Invalid shutdown_timeout: must be greater than 0");
        }

        if let Some(path) = &self.error_image {
            if !path.is_file() {
                bail!("Error image not found: {}", path.display());
            }
        }

        Ok(())
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            addr: self.addr(),
            read_timeout: self.read_timeout(),
            shutdown_timeout: Duration::from_secs(self.shutdown_timeout),
            restart_on_error: self.restart_on_error,
        }
    }
}
