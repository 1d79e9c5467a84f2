//! Log record formatting

use chrono::{DateTime, Utc};
use std::str::FromStr;

/// How logs should be formatted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Example: {"timestamp":"2024-01-15T10:30:00+00:00","level":"INFO","message":"..."}
    Json,

    /// env_logger's own layout with millisecond timestamps
    Human,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "human" => Ok(LogFormat::Human),
            other => Err(format!("unknown log format {:?}", other)),
        }
    }
}

/// One JSON object for `record`, without trailing newline
pub fn format_json(record: &log::Record<'_>, timestamp: DateTime<Utc>) -> String {
    let mut json = serde_json::Map::new();

    json.insert("timestamp".to_string(), serde_json::Value::String(timestamp.to_rfc3339()));
    json.insert("level".to_string(), serde_json::Value::String(record.level().to_string()));
    json.insert("target".to_string(), serde_json::Value::String(record.target().to_string()));
    json.insert("message".to_string(), serde_json::Value::String(record.args().to_string()));

    serde_json::to_string(&json).unwrap_or_else(|_| "Failed to serialize log entry".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format() {
        let timestamp =
            DateTime::parse_from_rfc3339("2024-01-15T10:30:00Z").unwrap().with_timezone(&Utc);
        let formatted = format_json(
            &log::Record::builder()
                .args(format_args!("cache {} warm", "base"))
                .level(log::Level::Warn)
                .target("resizr_core::cache")
                .build(),
            timestamp,
        );

        let parsed: serde_json::Value = serde_json::from_str(&formatted).unwrap();
        assert_eq!(parsed["message"], "cache base warm");
        assert_eq!(parsed["level"], "WARN");
        assert_eq!(parsed["target"], "resizr_core::cache");
        assert_eq!(parsed["timestamp"], "2024-01-15T10:30:00+00:00");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!("human".parse::<LogFormat>(), Ok(LogFormat::Human));
        assert!("logfmt".parse::<LogFormat>().is_err());
    }
}
