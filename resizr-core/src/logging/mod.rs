//! Logger installation
//!
//! Library code only uses the `log` macros; this installs the `env_logger`
//! backend once at startup. `RUST_LOG`, when set, overrides the configured
//! level.
//!
//! ```rust,no_run
//! use resizr_core::config::LoggingConfig;
//!
//! resizr_core::logging::init_logging(&LoggingConfig::default()).unwrap();
//! log::info!("server starting on port {}", 9000);
//! ```

pub mod formatter;

pub use formatter::LogFormat;

use crate::config::LoggingConfig;
use anyhow::{anyhow, Context, Result};
use std::io::Write;

/// Install the global logger. Calling it again is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let level: log::LevelFilter = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level {:?}", config.level))?;
    let format: LogFormat = config.format.parse().map_err(|e: String| anyhow!(e))?;

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    match format {
        LogFormat::Json => {
            builder.format(|buf, record| {
                writeln!(buf, "{}", formatter::format_json(record, chrono::Utc::now()))
            });
        }
        LogFormat::Human => {
            builder.format_timestamp_millis().format_module_path(false);
        }
    }

    if builder.try_init().is_err() {
        log::debug!("logger already installed, keeping it");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let config = LoggingConfig { level: "debug".to_string(), format: "json".to_string() };
        assert!(init_logging(&config).is_ok());
        assert!(init_logging(&LoggingConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        let config = LoggingConfig { level: "chatty".to_string(), ..Default::default() };
        assert!(init_logging(&config).is_err());
    }
}
