//! Logging configuration
//!
//! The core only describes how logging should be set up; installing a
//! subscriber is the host's job.

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Logging settings shared by every PhoenixFlow host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Level name: "error", "warn", "info", "debug" or "trace"
    pub level: String,
    /// Write log lines to stderr
    pub console_output: bool,
    /// Include the module path of each event
    pub show_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            show_target: false,
        }
    }
}

impl LogConfig {
    /// Parse the configured level, defaulting to INFO for unknown names
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "off" => LevelFilter::OFF,
            "error" => LevelFilter::ERROR,
            "warn" | "warning" => LevelFilter::WARN,
            "debug" => LevelFilter::DEBUG,
            "trace" => LevelFilter::TRACE,
            _ => LevelFilter::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "DEBUG".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "warning".to_string();
        assert_eq!(config.parse_level(), LevelFilter::WARN);

        config.level = "nonsense".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }
}
