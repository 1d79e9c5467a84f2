//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

pub const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
pub const FORMATS: [&str; 2] = ["human", "json"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: RESIZR_LOG_LEVEL
    pub level: String,
    /// `human` or `json`. Env: RESIZR_LOG_FORMAT
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "human".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("RESIZR_LOG_LEVEL") {
            self.level = level.to_ascii_lowercase();
        }
        if let Ok(format) = env::var("RESIZR_LOG_FORMAT") {
            self.format = format.to_ascii_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !LEVELS.contains(&self.level.as_str()) {
            bail!("Invalid log level {:?}: expected one of {}", self.level, LEVELS.join(", "));
        }
        if !FORMATS.contains(&self.format.as_str()) {
            bail!("Invalid log format {:?}: expected one of {}", self.format, FORMATS.join(", "));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(LoggingConfig::default().validate().is_ok());
        let cfg = LoggingConfig { level: "loud".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
        let cfg = LoggingConfig { format: "xml".to_string(), ..Default::default() };
        assert!(cfg.validate().is_err());
    }
}
