//! Rotating file writer with size-triggered rotation
//!
//! Before a write that would push the file past `max_size`, the current file
//! is rotated: `app.log.N` is deleted, `app.log.i` moves to `app.log.i+1`,
//! `app.log` becomes `app.log.1`, and a fresh `app.log` is opened. Backups may
//! optionally be gzip-compressed (`app.log.1.gz`).
//!
//! Rotation is best effort. Failed renames or deletions are reported on
//! stderr and otherwise ignored; the write still goes through.

use super::file::open_append;
use crate::core::{LoggerError, Result, Writer};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for rotating file writer
///
/// # Examples
///
/// ```
/// use crashsafe_logger::writers::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size(50 * 1024 * 1024)
///     .with_max_backups(7)
///     .with_compression(true);
/// assert_eq!(policy.max_backups, 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size in bytes a file may reach before rotation
    pub max_size: u64,
    /// Maximum number of rotated files to keep
    pub max_backups: usize,
    /// Whether to gzip rotated files
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024, // 10 MB
            max_backups: 5,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_size = size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }
}

struct RotatingState {
    file: Option<File>,
    current_size: u64,
}

/// # Examples
///
/// ```no_run
/// use crashsafe_logger::prelude::*;
/// use crashsafe_logger::writers::{RotatingFileWriter, RotationPolicy};
///
/// let policy = RotationPolicy::new().with_max_size(1024 * 1024).with_max_backups(3);
/// let writer = RotatingFileWriter::with_policy("/var/log/app.log", policy).unwrap();
/// writer.write(b"hello\n");
/// ```
pub struct RotatingFileWriter {
    base_path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<RotatingState>,
}

impl RotatingFileWriter {
    /// Create a new rotating file writer with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be created or opened
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Create a new rotating file writer with custom policy
    ///
    /// # Errors
    ///
    /// Returns error if `max_size` is zero or the file cannot be opened
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        if policy.max_size == 0 {
            return Err(LoggerError::config(
                "RotatingFileWriter",
                "max_size must be non-zero",
            ));
        }

        let base_path = path.as_ref().to_path_buf();
        let file = open_append(&base_path)?;
        let current_size = file
            .metadata()
            .map_err(|e| {
                LoggerError::file_writer(
                    base_path.display().to_string(),
                    format!("Cannot access file metadata: {}", e),
                )
            })?
            .len();

        Ok(Self {
            base_path,
            policy,
            state: Mutex::new(RotatingState {
                file: Some(file),
                current_size,
            }),
        })
    }

    /// Get current file size
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    pub fn path(&self) -> &Path {
        &self.base_path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Rotate now, regardless of size
    ///
    /// # Errors
    ///
    /// Returns error if a fresh file cannot be opened after rotation
    pub fn force_rotate(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.rotate(&mut state)
    }

    /// Backup path for index `i`: `app.log.i`
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self
            .base_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "app.log".into());
        name.push(format!(".{}", index));
        self.base_path.with_file_name(name)
    }

    /// Compressed backup path for index `i`: `app.log.i.gz`
    pub fn compressed_backup_path(&self, index: usize) -> PathBuf {
        let mut path = self.backup_path(index).into_os_string();
        path.push(".gz");
        PathBuf::from(path)
    }

    fn rotate(&self, state: &mut RotatingState) -> Result<()> {
        // Close the current file before renaming it
        if let Some(mut file) = state.file.take() {
            let _ = file.flush();
        }

        let max_backups = self.policy.max_backups;
        if max_backups == 0 {
            remove_if_exists(&self.base_path);
        } else {
            remove_if_exists(&self.backup_path(max_backups));
            remove_if_exists(&self.compressed_backup_path(max_backups));

            for i in (1..max_backups).rev() {
                rename_if_exists(&self.backup_path(i), &self.backup_path(i + 1));
                rename_if_exists(
                    &self.compressed_backup_path(i),
                    &self.compressed_backup_path(i + 1),
                );
            }

            let first = self.backup_path(1);
            if rename_if_exists(&self.base_path, &first) && self.policy.compress {
                if let Err(e) = compress_file(&first, &self.compressed_backup_path(1)) {
                    eprintln!("[LOGGER WARNING] Backup compression failed: {}", e);
                }
            }
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.base_path)
            .map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to create new log file: {}", e),
                )
            })?;

        state.file = Some(file);
        state.current_size = 0;
        Ok(())
    }

    /// Reopen the base file after a failed rotation left no handle
    fn reopen(&self, state: &mut RotatingState) {
        if state.file.is_some() {
            return;
        }
        if let Ok(file) = open_append(&self.base_path) {
            state.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
            state.file = Some(file);
        }
    }
}

fn remove_if_exists(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            eprintln!(
                "[LOGGER WARNING] Failed to remove old backup {}: {}",
                path.display(),
                e
            );
        }
    }
}

/// Returns `true` if `from` existed and was moved
fn rename_if_exists(from: &Path, to: &Path) -> bool {
    if !from.exists() {
        return false;
    }
    match fs::rename(from, to) {
        Ok(()) => true,
        Err(_) => {
            // On some platforms rename fails if the destination exists
            let _ = fs::remove_file(to);
            match fs::rename(from, to) {
                Ok(()) => true,
                Err(e) => {
                    eprintln!(
                        "[LOGGER WARNING] Failed to rotate {} to {}: {}",
                        from.display(),
                        to.display(),
                        e
                    );
                    false
                }
            }
        }
    }
}

/// Gzip `path` into `gz_path` through a temporary file; the original is only
/// removed once the compressed copy is complete
fn compress_file(path: &Path, gz_path: &Path) -> Result<()> {
    let mut temp = gz_path.as_os_str().to_os_string();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let result = (|| -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(path)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, gz_path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress {}", path.display()),
            e,
        ));
    }

    let _ = fs::remove_file(path);
    Ok(())
}

impl RotatingFileWriter {
    fn write_locked(&self, state: &mut RotatingState, data: &[u8]) -> bool {
        if state.current_size + data.len() as u64 > self.policy.max_size {
            if let Err(e) = self.rotate(state) {
                eprintln!(
                    "[LOGGER WARNING] Log rotation failed: {}. Continuing with current file.",
                    e
                );
                self.reopen(state);
            }
        }

        let written = match state.file.as_mut() {
            Some(file) => file.write_all(data).is_ok(),
            None => false,
        };
        if written {
            state.current_size += data.len() as u64;
        }
        written
    }

    fn flush_locked(state: &mut RotatingState) -> bool {
        state.file.as_mut().map_or(true, |file| file.flush().is_ok())
    }
}

impl Writer for RotatingFileWriter {
    fn write(&self, data: &[u8]) {
        let mut state = self.state.lock();
        self.write_locked(&mut state, data);
    }

    fn flush(&self) {
        Self::flush_locked(&mut self.state.lock());
    }

    fn name(&self) -> &str {
        "rotating_file"
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        self.state
            .try_lock_for(wait)
            .is_some_and(|mut state| self.write_locked(&mut state, data))
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        self.state
            .try_lock_for(wait)
            .is_some_and(|mut state| Self::flush_locked(&mut state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn test_rotation_policy_builder() {
        let policy = RotationPolicy::new()
            .with_max_size(1024)
            .with_max_backups(3)
            .with_compression(true);

        assert_eq!(policy.max_size, 1024);
        assert_eq!(policy.max_backups, 3);
        assert!(policy.compress);
    }

    #[test]
    fn test_rotating_writer_creation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("test.log");

        let writer = RotatingFileWriter::new(&log_path).unwrap();
        assert_eq!(writer.path(), log_path);
        assert_eq!(writer.current_size(), 0);
    }

    #[test]
    fn test_initial_size_from_existing_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("existing.log");
        fs::write(&log_path, b"0123456789").unwrap();

        let writer = RotatingFileWriter::new(&log_path).unwrap();
        assert_eq!(writer.current_size(), 10);
    }

    #[test]
    fn test_backup_paths() {
        let dir = tempdir().unwrap();
        let writer = RotatingFileWriter::new(dir.path().join("app.log")).unwrap();

        assert_eq!(writer.backup_path(2), dir.path().join("app.log.2"));
        assert_eq!(
            writer.compressed_backup_path(1),
            dir.path().join("app.log.1.gz")
        );
    }

    #[test]
    fn test_rotation_before_overflowing_write() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("rotation.log");
        let policy = RotationPolicy::new().with_max_size(10).with_max_backups(3);
        let writer = RotatingFileWriter::with_policy(&log_path, policy).unwrap();

        writer.write(b"aaaaaa");
        writer.write(b"bbbb");
        assert_eq!(writer.current_size(), 10);
        assert!(!writer.backup_path(1).exists());

        writer.write(b"c");
        assert_eq!(fs::read(writer.backup_path(1)).unwrap(), b"aaaaaabbbb");
        assert_eq!(fs::read(&log_path).unwrap(), b"c");
        assert_eq!(writer.current_size(), 1);
    }

    #[test]
    fn test_oldest_backup_discarded() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("multi.log");
        let policy = RotationPolicy::new().with_max_size(4).with_max_backups(2);
        let writer = RotatingFileWriter::with_policy(&log_path, policy).unwrap();

        for payload in [b"1111", b"2222", b"3333", b"4444"] {
            writer.write(payload);
        }

        assert_eq!(fs::read(&log_path).unwrap(), b"4444");
        assert_eq!(fs::read(writer.backup_path(1)).unwrap(), b"3333");
        assert_eq!(fs::read(writer.backup_path(2)).unwrap(), b"2222");
        assert!(!writer.backup_path(3).exists());
    }

    #[test]
    fn test_zero_backups_truncates() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nobackup.log");
        let policy = RotationPolicy::new().with_max_size(4).with_max_backups(0);
        let writer = RotatingFileWriter::with_policy(&log_path, policy).unwrap();

        writer.write(b"1111");
        writer.write(b"2222");

        assert_eq!(fs::read(&log_path).unwrap(), b"2222");
        assert!(!writer.backup_path(1).exists());
    }

    #[test]
    fn test_compressed_rotation() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("gz.log");
        let policy = RotationPolicy::new()
            .with_max_size(8)
            .with_max_backups(2)
            .with_compression(true);
        let writer = RotatingFileWriter::with_policy(&log_path, policy).unwrap();

        writer.write(b"first-12");
        writer.write(b"second12");
        writer.write(b"third-12");

        assert!(!writer.backup_path(1).exists());
        let gz1 = writer.compressed_backup_path(1);
        let gz2 = writer.compressed_backup_path(2);
        assert!(gz1.exists());
        assert!(gz2.exists());

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(File::open(gz1).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "second12");
    }

    #[test]
    fn test_force_rotate() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("manual.log");
        let writer = RotatingFileWriter::new(&log_path).unwrap();

        writer.write(b"before");
        writer.force_rotate().unwrap();
        writer.write(b"after");

        assert_eq!(fs::read(writer.backup_path(1)).unwrap(), b"before");
        assert_eq!(fs::read(&log_path).unwrap(), b"after");
    }

    #[test]
    fn test_crash_write_rotates_and_gives_up_when_locked() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("crash.log");
        let policy = RotationPolicy::new().with_max_size(8).with_max_backups(2);
        let writer = RotatingFileWriter::with_policy(&log_path, policy).unwrap();
        let wait = Duration::from_millis(20);

        writer.write(b"first");
        assert!(writer.write_on_crash(b"fatal", wait));
        assert!(writer.flush_on_crash(wait));
        assert_eq!(fs::read(writer.backup_path(1)).unwrap(), b"first");
        assert_eq!(fs::read(&log_path).unwrap(), b"fatal");

        let held = writer.state.lock();
        assert!(!writer.write_on_crash(b"lost", wait));
        assert!(!writer.flush_on_crash(wait));
        drop(held);
        assert_eq!(writer.current_size(), 5);
    }

    #[test]
    fn test_zero_max_size_rejected() {
        let dir = tempdir().unwrap();
        let policy = RotationPolicy::new().with_max_size(0);
        let result = RotatingFileWriter::with_policy(dir.path().join("x.log"), policy);
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}
