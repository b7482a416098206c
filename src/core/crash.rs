//! Crash-flush registry
//!
//! A process-wide list of writers that must be flushed when the process
//! faults, plus an optional "current logger" that receives the fault message
//! at Fatal level. The registry is explicitly brought up with [`init`] and
//! torn down with [`shutdown`]; registrations made in between should be
//! bracketed by the writer's lifetime, which [`register_guarded`] does for
//! you.
//!
//! The panic hook may run on a thread that faulted inside a writer while
//! holding that writer's lock. Every lock on the crash path is therefore
//! taken with a timeout, and writers are reached through
//! [`Writer::flush_on_crash`] and [`Writer::write_on_crash`].
//!
//! # Example
//!
//! ```
//! use crashsafe_logger::core::crash::{self, CrashConfig};
//! use crashsafe_logger::prelude::*;
//! use std::sync::Arc;
//!
//! crash::init(CrashConfig::default()).unwrap();
//!
//! let sink = Arc::new(MemoryWriter::new());
//! let buffered: Arc<dyn Writer> = Arc::new(AsyncWriter::new(sink.clone(), 1024, 512).unwrap());
//! let guard = crash::register_guarded(buffered.clone()).unwrap();
//!
//! buffered.write(b"pending\n");
//! crash::flush_all_crash_writers();
//! assert_eq!(sink.contents(), b"pending\n");
//!
//! drop(guard);
//! crash::shutdown();
//! ```

use super::error::{LoggerError, Result};
use super::log_level::LogLevel;
use super::logger::Logger;
use super::writer::{same_writer, Writer};
use parking_lot::{const_mutex, Mutex};
use std::io::Write as _;
use std::panic::PanicHookInfo;
use std::sync::Arc;
use std::time::Duration;

/// Maximum number of writers the registry holds
pub const CRASH_REGISTRY_CAPACITY: usize = 16;

/// Bound on every registry lock taken from the crash path
const REGISTRY_LOCK_WAIT: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct CrashConfig {
    /// Abort the process after the crash sequence instead of handing the
    /// panic to the previously installed hook
    pub abort: bool,
    /// How long the crash path waits for the global logger's lock
    pub logger_lock_wait: Duration,
    /// How long the crash path waits on each registered writer
    pub writer_lock_wait: Duration,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            abort: true,
            logger_lock_wait: Duration::from_millis(100),
            writer_lock_wait: Duration::from_millis(100),
        }
    }
}

type PanicHook = Arc<dyn Fn(&PanicHookInfo<'_>) + Send + Sync + 'static>;

struct Registry {
    config: Option<CrashConfig>,
    entries: Vec<Arc<dyn Writer>>,
    global_logger: Option<Logger>,
    /// Hook that was installed before [`init`]; chained to and restored
    previous_hook: Option<PanicHook>,
}

static REGISTRY: Mutex<Registry> = const_mutex(Registry {
    config: None,
    entries: Vec::new(),
    global_logger: None,
    previous_hook: None,
});

/// Bring up the registry and install the panic hook.
///
/// # Errors
///
/// `RegistryAlreadyInitialized` if called twice without [`shutdown`].
pub fn init(config: CrashConfig) -> Result<()> {
    let mut registry = REGISTRY.lock();
    if registry.config.is_some() {
        return Err(LoggerError::RegistryAlreadyInitialized);
    }

    let abort = config.abort;
    let previous: PanicHook = Arc::from(std::panic::take_hook());
    let chained = Arc::clone(&previous);
    std::panic::set_hook(Box::new(move |info| {
        handle_crash(&info.to_string());
        if abort {
            std::process::abort();
        }
        chained(info);
    }));

    registry.previous_hook = Some(previous);
    registry.config = Some(config);
    Ok(())
}

/// Flush everything, drop all registrations and the global logger, and
/// reinstall the panic hook that was in place before [`init`]. No-op when
/// not initialized.
pub fn shutdown() {
    let (entries, global_logger, previous_hook) = {
        let mut registry = REGISTRY.lock();
        if registry.config.take().is_none() {
            return;
        }
        (
            std::mem::take(&mut registry.entries),
            registry.global_logger.take(),
            registry.previous_hook.take(),
        )
    };

    // outside the registry lock; the last logger handle flushes its writers
    for writer in &entries {
        writer.flush();
    }
    drop(global_logger);

    if let Some(previous) = previous_hook {
        if !std::thread::panicking() {
            std::panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}

pub fn is_initialized() -> bool {
    REGISTRY.lock().config.is_some()
}

/// Add a writer to be flushed on crash. Registering the same writer twice
/// keeps a single entry.
///
/// # Errors
///
/// `RegistryNotInitialized` before [`init`], `RegistryFull` once
/// [`CRASH_REGISTRY_CAPACITY`] writers are registered.
pub fn register(writer: Arc<dyn Writer>) -> Result<()> {
    let mut registry = REGISTRY.lock();
    if registry.config.is_none() {
        return Err(LoggerError::RegistryNotInitialized);
    }
    if registry.entries.iter().any(|w| same_writer(w, &writer)) {
        return Ok(());
    }
    if registry.entries.len() >= CRASH_REGISTRY_CAPACITY {
        return Err(LoggerError::RegistryFull {
            capacity: CRASH_REGISTRY_CAPACITY,
        });
    }
    registry.entries.push(writer);
    Ok(())
}

/// Remove a writer, shifting later entries down. Returns `false` if it was
/// not registered.
pub fn unregister(writer: &Arc<dyn Writer>) -> bool {
    let mut registry = REGISTRY.lock();
    match registry.entries.iter().position(|w| same_writer(w, writer)) {
        Some(idx) => {
            registry.entries.remove(idx);
            true
        }
        None => false,
    }
}

/// Register a writer for as long as the returned guard lives
pub fn register_guarded(writer: Arc<dyn Writer>) -> Result<CrashGuard> {
    register(Arc::clone(&writer))?;
    Ok(CrashGuard { writer })
}

pub fn registered_count() -> usize {
    REGISTRY.lock().entries.len()
}

/// Install the logger that receives the Fatal record on crash
///
/// # Errors
///
/// `RegistryNotInitialized` before [`init`].
pub fn set_global_logger(logger: Logger) -> Result<()> {
    let previous = {
        let mut registry = REGISTRY.lock();
        if registry.config.is_none() {
            return Err(LoggerError::RegistryNotInitialized);
        }
        registry.global_logger.replace(logger)
    };
    drop(previous);
    Ok(())
}

pub fn clear_global_logger() {
    let previous = REGISTRY.lock().global_logger.take();
    drop(previous);
}

pub fn global_logger() -> Option<Logger> {
    REGISTRY.lock().global_logger.clone()
}

/// Flush every registered writer, then the global logger's writers.
///
/// Entries are copied out first so no writer I/O happens under the
/// registry lock. A writer whose lock stays busy past the configured wait
/// is skipped. Returns `false` if anything was skipped.
pub fn flush_all_crash_writers() -> bool {
    let Some(registry) = REGISTRY.try_lock_for(REGISTRY_LOCK_WAIT) else {
        return false;
    };
    let entries = registry.entries.clone();
    let logger = registry.global_logger.clone();
    let (writer_wait, logger_wait) = registry
        .config
        .as_ref()
        .map_or((REGISTRY_LOCK_WAIT, REGISTRY_LOCK_WAIT), |c| {
            (c.writer_lock_wait, c.logger_lock_wait)
        });
    drop(registry);

    let mut complete = true;
    for writer in &entries {
        complete &= writer.flush_on_crash(writer_wait);
    }
    if let Some(logger) = logger {
        complete &= logger.flush_best_effort(logger_wait);
    }
    complete
}

/// The crash sequence run by the panic hook: log the message at Fatal
/// through the global logger, flush every crash writer, then write a
/// last-resort line straight to stderr. Does not terminate the process.
pub fn handle_crash(message: &str) {
    let (logger, wait) = match REGISTRY.try_lock_for(REGISTRY_LOCK_WAIT) {
        Some(registry) => (
            registry.global_logger.clone(),
            registry
                .config
                .as_ref()
                .map_or(REGISTRY_LOCK_WAIT, |c| c.logger_lock_wait),
        ),
        None => (None, REGISTRY_LOCK_WAIT),
    };

    if let Some(logger) = logger {
        logger.log_best_effort(LogLevel::Fatal, message, wait);
    }

    flush_all_crash_writers();

    let _ = writeln!(std::io::stderr(), "[LOGGER FATAL] {}", message);
}

/// Unregisters its writer when dropped
#[must_use = "dropping the guard unregisters the writer immediately"]
pub struct CrashGuard {
    writer: Arc<dyn Writer>,
}

impl CrashGuard {
    pub fn writer(&self) -> &Arc<dyn Writer> {
        &self.writer
    }
}

impl Drop for CrashGuard {
    fn drop(&mut self) {
        unregister(&self.writer);
    }
}
