//! Logging macros with `format!` arguments.
//!
//! # Examples
//!
//! ```
//! use crashsafe_logger::prelude::*;
//! use crashsafe_logger::{fields, info, warn};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MemoryWriter::new());
//! let logger = Logger::builder().timestamps(false).writer(sink.clone()).build().unwrap();
//!
//! let port = 8080;
//! info!(logger, "listening on port {}", port);
//! warn!(logger, fields!["attempt" => 3, "host" => "db1"]; "retrying");
//!
//! assert_eq!(
//!     sink.contents_string(),
//!     "[INFO] listening on port 8080\n[WARN] retrying attempt=3 host=\"db1\"\n"
//! );
//! ```

/// Build a `[Field; N]` array from `key => value` pairs.
///
/// ```
/// use crashsafe_logger::fields;
///
/// let fields = fields!["user_id" => 42u64, "admin" => false];
/// assert_eq!(fields.len(), 2);
/// assert_eq!(fields[0].to_string(), "user_id=42");
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {
        [$($crate::Field::new($key, $value)),*]
    };
}

/// Log at an explicit level.
///
/// Fields go before the message, separated by `;`. Format arguments are
/// only evaluated when the level is enabled.
///
/// ```
/// # use crashsafe_logger::prelude::*;
/// # let logger = Logger::new();
/// use crashsafe_logger::{fields, log};
/// log!(logger, LogLevel::Info, "Simple message");
/// log!(logger, LogLevel::Error, "Error code: {}", 500);
/// log!(logger, LogLevel::Warn, fields!["code" => 503]; "upstream unavailable");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $fields:expr; $($arg:tt)+) => {
        if $logger.enabled($level) {
            $logger.log($level, &format!($($arg)+), &$fields);
        } else {
            $logger.metrics().record_filtered();
        }
    };
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        if $logger.enabled($level) {
            $logger.log($level, &format!($($arg)+), &[]);
        } else {
            $logger.metrics().record_filtered();
        }
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $fields:expr; $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $fields; $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $fields:expr; $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $fields; $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $fields:expr; $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $fields; $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $fields:expr; $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $fields; $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Error, $($arg)+)
    };
}

/// Log a fatal-level message.
///
/// Only logs; the process keeps running.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $fields:expr; $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $fields; $($arg)+)
    };
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::LogLevel::Fatal, $($arg)+)
    };
}
