//! Core logger types and traits

pub mod config;
pub mod crash;
pub mod error;
pub mod field;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod timestamp;
pub mod writer;

pub use config::{LoggerConfig, DEFAULT_RECORD_BUFFER_SIZE};
pub use crash::{CrashConfig, CrashGuard, CRASH_REGISTRY_CAPACITY};
pub use error::{LoggerError, Result};
pub use field::{Field, FieldValue};
pub use log_entry::LogEntry;
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder};
pub use metrics::LoggerMetrics;
pub use output_format::{OutputFormat, RecordBuffer, RenderOptions};
pub use timestamp::TimestampFormat;
pub use writer::Writer;
