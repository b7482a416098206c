//! # Crashsafe Logger
//!
//! A structured, multi-backend logging core. A [`Logger`] renders records as
//! text, JSON or ANSI-colored text and fans them out to any number of
//! [`Writer`] backends; a crash-flush registry makes sure buffered backends
//! reach their sink when the process panics.
//!
//! ## Features
//!
//! - **Structured fields**: typed key/value pairs, per call or bound to a child logger
//! - **Buffered backends**: double-buffered, lock-free ring and per-thread writers
//! - **Files**: plain, buffered and size-rotated files with optional gzip backups
//! - **Crash safety**: registered writers are flushed from the panic hook
//!
//! ```
//! use crashsafe_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemoryWriter::new());
//! let logger = Logger::builder()
//!     .level(LogLevel::Debug)
//!     .timestamps(false)
//!     .module("api")
//!     .writer(sink.clone())
//!     .build()
//!     .unwrap();
//!
//! logger.info_with("request served", &[Field::new("status", 200)]);
//! assert_eq!(sink.contents_string(), "[INFO] (api) request served status=200\n");
//! ```

pub mod core;
pub mod macros;
pub mod writers;

pub mod prelude {
    pub use crate::core::crash::{self, CrashConfig, CrashGuard};
    pub use crate::core::{
        Field, FieldValue, LogLevel, Logger, LoggerBuilder, LoggerConfig, LoggerError,
        LoggerMetrics, OutputFormat, Result, Writer,
    };
    pub use crate::writers::{
        AsyncWriter, BufferedFileWriter, FileWriter, LockFreeConfig, LockFreeWriter,
        MemoryWriter, MultiWriter, RotatingFileWriter, RotationPolicy, StderrWriter,
        StdoutWriter, ThreadLocalWriter,
    };
}

pub use crate::core::{
    CrashConfig, CrashGuard, Field, FieldValue, LogEntry, LogLevel, Logger, LoggerBuilder,
    LoggerConfig, LoggerError, LoggerMetrics, OutputFormat, Result, TimestampFormat, Writer,
    CRASH_REGISTRY_CAPACITY,
};
