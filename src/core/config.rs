//! Logger configuration
//!
//! `LoggerConfig` is a plain value. The logger copies it at construction and
//! mutates its copy through setters; it can also be loaded from JSON.

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::output_format::{OutputFormat, RenderOptions};
use super::timestamp::MAX_OFFSET_SECONDS;
use serde::{Deserialize, Serialize};

/// Default capacity of the per-logger record buffer
pub const DEFAULT_RECORD_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Minimum severity to emit
    pub level: LogLevel,
    pub format: OutputFormat,
    pub module_name: Option<String>,
    pub include_timestamp: bool,
    pub include_module: bool,
    /// Seconds east of UTC applied to record timestamps
    pub timezone_offset_seconds: i32,
    /// Records rendering larger than this are dropped
    pub record_buffer_size: usize,
    /// Flush every writer right after an Error or Fatal record
    pub sync_on_error: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: OutputFormat::Text,
            module_name: None,
            include_timestamp: true,
            include_module: true,
            timezone_offset_seconds: 0,
            record_buffer_size: DEFAULT_RECORD_BUFFER_SIZE,
            sync_on_error: true,
        }
    }
}

impl LoggerConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration; missing keys take defaults.
    ///
    /// ```
    /// use crashsafe_logger::{LoggerConfig, LogLevel, OutputFormat};
    ///
    /// let config = LoggerConfig::from_json(r#"{"level":"warn","format":"json"}"#).unwrap();
    /// assert_eq!(config.level, LogLevel::Warn);
    /// assert_eq!(config.format, OutputFormat::Json);
    /// assert!(config.sync_on_error);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LoggerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.record_buffer_size == 0 {
            return Err(LoggerError::config(
                "LoggerConfig",
                "record_buffer_size must be non-zero",
            ));
        }
        if self.timezone_offset_seconds.abs() >= MAX_OFFSET_SECONDS {
            return Err(LoggerError::config(
                "LoggerConfig",
                format!(
                    "timezone_offset_seconds {} is outside +/-{}",
                    self.timezone_offset_seconds, MAX_OFFSET_SECONDS
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn render_options(&self) -> RenderOptions {
        RenderOptions {
            include_timestamp: self.include_timestamp,
            include_module: self.include_module,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, OutputFormat::Text);
        assert_eq!(config.record_buffer_size, DEFAULT_RECORD_BUFFER_SIZE);
        assert!(config.include_timestamp);
        assert!(config.include_module);
        assert!(config.sync_on_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = LoggerConfig::from_json(
            r#"{"module_name":"api","timezone_offset_seconds":3600,"sync_on_error":false}"#,
        )
        .unwrap();

        assert_eq!(config.module_name.as_deref(), Some("api"));
        assert_eq!(config.timezone_offset_seconds, 3600);
        assert!(!config.sync_on_error);
        assert_eq!(config.level, LogLevel::Info);
    }

    #[test]
    fn test_validation_errors() {
        let err = LoggerConfig::from_json(r#"{"record_buffer_size":0}"#).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerConfig::from_json(r#"{"timezone_offset_seconds":90000}"#).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));

        let err = LoggerConfig::from_json(r#"{"level":"loud"}"#).unwrap_err();
        assert!(matches!(err, LoggerError::JsonError(_)));
    }
}
