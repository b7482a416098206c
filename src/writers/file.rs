//! File writer implementations
//!
//! - `FileWriter`: every write goes straight to the file
//! - `BufferedFileWriter`: writes collect in a fixed buffer until it fills
//!   or `flush` is called

use crate::core::{LoggerError, Result, Writer};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default buffer capacity for `BufferedFileWriter`
pub const DEFAULT_FILE_BUFFER_SIZE: usize = 8 * 1024;

pub(crate) fn open_append(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            LoggerError::io_operation(
                "create log directory",
                format!("Failed to create directory '{}'", parent.display()),
                e,
            )
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_writer(path.display().to_string(), format!("Failed to open: {}", e))
        })
}

pub struct FileWriter {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileWriter {
    /// Open `path` for appending, creating it and its parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be created or opened
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Writer for FileWriter {
    fn write(&self, data: &[u8]) {
        let _ = self.file.lock().write_all(data);
    }

    fn flush(&self) {
        let _ = self.file.lock().flush();
    }

    fn name(&self) -> &str {
        "file"
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        self.file
            .try_lock_for(wait)
            .is_some_and(|mut file| file.write_all(data).is_ok())
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        self.file
            .try_lock_for(wait)
            .is_some_and(|mut file| file.flush().is_ok())
    }
}

pub struct BufferedFileWriter {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl BufferedFileWriter {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_capacity(path, DEFAULT_FILE_BUFFER_SIZE)
    }

    /// # Errors
    ///
    /// Returns error if `capacity` is zero or the file cannot be opened
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(LoggerError::config(
                "BufferedFileWriter",
                "buffer capacity must be non-zero",
            ));
        }
        let path = path.into();
        let file = open_append(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::with_capacity(capacity, file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes waiting in the buffer
    pub fn buffered_len(&self) -> usize {
        self.writer.lock().buffer().len()
    }
}

impl Writer for BufferedFileWriter {
    fn write(&self, data: &[u8]) {
        let _ = self.writer.lock().write_all(data);
    }

    fn flush(&self) {
        let _ = self.writer.lock().flush();
    }

    fn name(&self) -> &str {
        "buffered_file"
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        self.writer
            .try_lock_for(wait)
            .is_some_and(|mut writer| writer.write_all(data).is_ok())
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        self.writer
            .try_lock_for(wait)
            .is_some_and(|mut writer| writer.flush().is_ok())
    }
}

impl Drop for BufferedFileWriter {
    fn drop(&mut self) {
        // Ensure all buffered data is flushed to disk
        let _ = self.writer.get_mut().flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_writer_is_unbuffered() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/app.log");

        let writer = FileWriter::new(&path).unwrap();
        writer.write(b"line one\n");

        assert_eq!(fs::read_to_string(&path).unwrap(), "line one\n");
        assert_eq!(writer.path(), path);
    }

    #[test]
    fn test_file_writer_appends() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing\n").unwrap();

        let writer = FileWriter::new(&path).unwrap();
        writer.write(b"new\n");

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing\nnew\n");
    }

    #[test]
    fn test_buffered_file_writer_holds_until_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("buffered.log");

        let writer = BufferedFileWriter::with_capacity(&path, 64).unwrap();
        writer.write(b"held\n");

        assert_eq!(writer.buffered_len(), 5);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        writer.flush();
        assert_eq!(writer.buffered_len(), 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "held\n");
    }

    #[test]
    fn test_buffered_file_writer_spills_when_full() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("spill.log");

        let writer = BufferedFileWriter::with_capacity(&path, 8).unwrap();
        writer.write(b"12345");
        writer.write(b"6789");

        assert_eq!(fs::read_to_string(&path).unwrap(), "12345");
        assert_eq!(writer.buffered_len(), 4);
    }

    #[test]
    fn test_buffered_file_writer_flushes_on_drop() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("drop.log");

        {
            let writer = BufferedFileWriter::new(&path).unwrap();
            writer.write(b"kept\n");
        }

        assert_eq!(fs::read_to_string(&path).unwrap(), "kept\n");
    }

    #[test]
    fn test_buffered_file_crash_flush() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crash.log");
        let wait = Duration::from_millis(20);

        let writer = BufferedFileWriter::with_capacity(&path, 64).unwrap();
        writer.write(b"held\n");

        let guard = writer.writer.lock();
        assert!(!writer.flush_on_crash(wait));
        drop(guard);
        assert_eq!(fs::read_to_string(&path).unwrap(), "");

        assert!(writer.write_on_crash(b"fatal\n", wait));
        assert!(writer.flush_on_crash(wait));
        assert_eq!(fs::read_to_string(&path).unwrap(), "held\nfatal\n");
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let dir = tempdir().unwrap();
        let result = BufferedFileWriter::with_capacity(dir.path().join("x.log"), 0);
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }
}
