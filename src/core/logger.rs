//! Main logger implementation
//!
//! A `Logger` is a cheap handle onto shared state. Child handles created
//! with [`Logger::with_fields`] or [`Logger::with_scope`] share the parent's
//! writers, configuration and lock, and add their own decoration.

use super::{
    config::LoggerConfig,
    error::Result,
    field::Field,
    log_entry::LogEntry,
    log_level::LogLevel,
    metrics::LoggerMetrics,
    output_format::{OutputFormat, RecordBuffer},
    timestamp::now_with_offset,
    writer::{same_writer, Writer},
};
use parking_lot::Mutex;
use std::io::Write as _;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct LoggerState {
    config: LoggerConfig,
    writers: Vec<Arc<dyn Writer>>,
    buffer: RecordBuffer,
}

struct LoggerShared {
    /// Mirror of `config.level`, read without taking the lock
    min_level: AtomicU8,
    state: Mutex<LoggerState>,
    metrics: LoggerMetrics,
}

impl Drop for LoggerShared {
    fn drop(&mut self) {
        for writer in self.state.get_mut().writers.iter() {
            writer.flush();
        }
    }
}

#[derive(Clone)]
pub struct Logger {
    shared: Arc<LoggerShared>,
    fields: Arc<[Field]>,
    scope: Option<Arc<str>>,
}

impl Logger {
    /// Logger with the default configuration and no writers
    #[must_use]
    pub fn new() -> Self {
        Self::from_parts(LoggerConfig::default(), Vec::new())
    }

    /// Create a logger from a configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the config fails validation
    pub fn with_config(config: LoggerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(config, Vec::new()))
    }

    fn from_parts(config: LoggerConfig, writers: Vec<Arc<dyn Writer>>) -> Self {
        let shared = LoggerShared {
            min_level: AtomicU8::new(config.level.as_u8()),
            state: Mutex::new(LoggerState {
                buffer: RecordBuffer::with_capacity(config.record_buffer_size),
                config,
                writers,
            }),
            metrics: LoggerMetrics::new(),
        };
        Self {
            shared: Arc::new(shared),
            fields: Arc::from(Vec::new()),
            scope: None,
        }
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use crashsafe_logger::prelude::*;
    /// use std::sync::Arc;
    ///
    /// let logger = Logger::builder()
    ///     .level(LogLevel::Debug)
    ///     .format(OutputFormat::Json)
    ///     .writer(Arc::new(MemoryWriter::new()))
    ///     .build()
    ///     .unwrap();
    /// logger.info("ready");
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    /// Child logger that attaches `fields` to every record, after any fields
    /// the parent already carries
    #[must_use]
    pub fn with_fields(&self, fields: &[Field]) -> Logger {
        let merged: Vec<Field> = self.fields.iter().chain(fields.iter()).cloned().collect();
        Logger {
            shared: Arc::clone(&self.shared),
            fields: Arc::from(merged),
            scope: self.scope.clone(),
        }
    }

    /// Child logger whose module is `name`, nested under the parent's module
    /// as `parent.name` when the parent has one
    #[must_use]
    pub fn with_scope(&self, name: &str) -> Logger {
        let scope = match self.module() {
            Some(parent) => format!("{}.{}", parent, name),
            None => name.to_string(),
        };
        Logger {
            shared: Arc::clone(&self.shared),
            fields: Arc::clone(&self.fields),
            scope: Some(Arc::from(scope)),
        }
    }

    /// Effective module for records from this handle
    pub fn module(&self) -> Option<String> {
        match &self.scope {
            Some(scope) => Some(scope.to_string()),
            None => self.shared.state.lock().config.module_name.clone(),
        }
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.shared.min_level.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    pub fn set_level(&self, level: LogLevel) {
        let mut state = self.shared.state.lock();
        state.config.level = level;
        self.shared.min_level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn format(&self) -> OutputFormat {
        self.shared.state.lock().config.format
    }

    /// Affects records emitted after the call
    pub fn set_format(&self, format: OutputFormat) {
        self.shared.state.lock().config.format = format;
    }

    pub fn set_module(&self, module: Option<&str>) {
        self.shared.state.lock().config.module_name = module.map(str::to_string);
    }

    pub fn set_sync_on_error(&self, enabled: bool) {
        self.shared.state.lock().config.sync_on_error = enabled;
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> LoggerConfig {
        self.shared.state.lock().config.clone()
    }

    /// Register a writer; records are dispatched in registration order
    pub fn add_writer(&self, writer: Arc<dyn Writer>) {
        self.shared.state.lock().writers.push(writer);
    }

    /// Flush and remove a writer. Returns `false` if it was not registered.
    pub fn remove_writer(&self, writer: &Arc<dyn Writer>) -> bool {
        let mut state = self.shared.state.lock();
        match state.writers.iter().position(|w| same_writer(w, writer)) {
            Some(idx) => {
                let removed = state.writers.remove(idx);
                removed.flush();
                true
            }
            None => false,
        }
    }

    /// Flush and remove every writer; later records fall back to stderr
    pub fn clear_writers(&self) {
        let mut state = self.shared.state.lock();
        for writer in state.writers.drain(..) {
            writer.flush();
        }
    }

    pub fn writer_count(&self) -> usize {
        self.shared.state.lock().writers.len()
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.shared.metrics
    }

    pub fn flush(&self) {
        let state = self.shared.state.lock();
        for writer in state.writers.iter() {
            writer.flush();
        }
    }

    /// Emit a record. No-op when `level` is below the configured minimum.
    pub fn log(&self, level: LogLevel, message: &str, fields: &[Field]) {
        if !self.enabled(level) {
            self.shared.metrics.record_filtered();
            return;
        }

        let mut state = self.shared.state.lock();
        self.emit(&mut state, level, message, fields, None);
    }

    /// Like [`log`](Self::log) but gives up if the logger lock cannot be
    /// taken within `wait`. Used on the crash path, where the lock may be
    /// held by the thread that faulted. Writers are reached through their
    /// bounded `write_on_crash`/`flush_on_crash`.
    pub fn log_best_effort(&self, level: LogLevel, message: &str, wait: Duration) -> bool {
        if !self.enabled(level) {
            return false;
        }

        match self.shared.state.try_lock_for(wait) {
            Some(mut state) => {
                self.emit(&mut state, level, message, &[], Some(wait));
                true
            }
            None => false,
        }
    }

    /// Flush with a bounded wait on the logger lock and on each writer
    pub(crate) fn flush_best_effort(&self, wait: Duration) -> bool {
        match self.shared.state.try_lock_for(wait) {
            Some(state) => state
                .writers
                .iter()
                .fold(true, |ok, writer| writer.flush_on_crash(wait) && ok),
            None => false,
        }
    }

    /// `crash_wait` switches writers to their bounded crash-path calls
    fn emit(
        &self,
        state: &mut LoggerState,
        level: LogLevel,
        message: &str,
        fields: &[Field],
        crash_wait: Option<Duration>,
    ) {
        let LoggerState {
            config,
            writers,
            buffer,
        } = state;
        let metrics = &self.shared.metrics;

        let module = self.scope.as_deref().or(config.module_name.as_deref());
        let entry = LogEntry::new(level, message, now_with_offset(config.timezone_offset_seconds))
            .with_module(module)
            .with_fields(&self.fields, fields);

        if config
            .format
            .render(&entry, config.render_options(), buffer)
            .is_err()
        {
            metrics.record_dropped();
            return;
        }

        if writers.is_empty() {
            let _ = std::io::stderr().write_all(buffer.as_bytes());
            metrics.record_fallback();
        } else {
            for writer in writers.iter() {
                match crash_wait {
                    Some(wait) => {
                        writer.write_on_crash(buffer.as_bytes(), wait);
                    }
                    None => writer.write(buffer.as_bytes()),
                }
            }
        }
        metrics.record_logged();

        if config.sync_on_error && level.is_severe() {
            for writer in writers.iter() {
                match crash_wait {
                    Some(wait) => {
                        writer.flush_on_crash(wait);
                    }
                    None => writer.flush(),
                }
            }
            metrics.record_sync_flush();
        }
    }

    #[inline]
    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, &[]);
    }

    #[inline]
    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, &[]);
    }

    #[inline]
    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, &[]);
    }

    #[inline]
    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, &[]);
    }

    #[inline]
    pub fn fatal(&self, message: &str) {
        self.log(LogLevel::Fatal, message, &[]);
    }

    #[inline]
    pub fn debug_with(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Debug, message, fields);
    }

    #[inline]
    pub fn info_with(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Info, message, fields);
    }

    #[inline]
    pub fn warn_with(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Warn, message, fields);
    }

    #[inline]
    pub fn error_with(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Error, message, fields);
    }

    #[inline]
    pub fn fatal_with(&self, message: &str, fields: &[Field]) {
        self.log(LogLevel::Fatal, message, fields);
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("scope", &self.scope)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use crashsafe_logger::prelude::*;
/// use std::sync::Arc;
///
/// let logger = Logger::builder()
///     .level(LogLevel::Warn)
///     .module("billing")
///     .timezone_offset(3600)
///     .sync_on_error(false)
///     .writer(Arc::new(StderrWriter::new()))
///     .build()
///     .unwrap();
/// assert_eq!(logger.level(), LogLevel::Warn);
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    writers: Vec<Arc<dyn Writer>>,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            writers: Vec::new(),
        }
    }

    /// Replace the whole configuration
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set minimum log level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.config.module_name = Some(module.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn timestamps(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn modules(mut self, enabled: bool) -> Self {
        self.config.include_module = enabled;
        self
    }

    /// Seconds east of UTC
    #[must_use = "builder methods return a new value"]
    pub fn timezone_offset(mut self, seconds: i32) -> Self {
        self.config.timezone_offset_seconds = seconds;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn record_buffer_size(mut self, size: usize) -> Self {
        self.config.record_buffer_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn sync_on_error(mut self, enabled: bool) -> Self {
        self.config.sync_on_error = enabled;
        self
    }

    /// Add a writer
    #[must_use = "builder methods return a new value"]
    pub fn writer(mut self, writer: Arc<dyn Writer>) -> Self {
        self.writers.push(writer);
        self
    }

    /// Build the Logger
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the config fails validation
    pub fn build(self) -> Result<Logger> {
        self.config.validate()?;
        Ok(Logger::from_parts(self.config, self.writers))
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
