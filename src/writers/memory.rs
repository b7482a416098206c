//! In-memory writer
//!
//! Captures everything written to it. Handy in tests and for embedding the
//! logger where output is inspected programmatically.

use crate::core::Writer;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryWriter {
    chunks: Mutex<Vec<Vec<u8>>>,
    flushes: AtomicUsize,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenation of every write so far
    pub fn contents(&self) -> Vec<u8> {
        self.chunks.lock().concat()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }

    /// Each write call's bytes, in arrival order
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        self.chunks.lock().clone()
    }

    pub fn write_count(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.chunks.lock().clear();
        self.flushes.store(0, Ordering::Relaxed);
    }
}

impl Writer for MemoryWriter {
    fn write(&self, data: &[u8]) {
        self.chunks.lock().push(data.to_vec());
    }

    fn flush(&self) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer_captures() {
        let writer = MemoryWriter::new();
        writer.write(b"ab");
        writer.write(b"cd");
        writer.flush();

        assert_eq!(writer.contents(), b"abcd");
        assert_eq!(writer.chunks(), vec![b"ab".to_vec(), b"cd".to_vec()]);
        assert_eq!(writer.write_count(), 2);
        assert_eq!(writer.flush_count(), 1);

        writer.clear();
        assert!(writer.contents().is_empty());
        assert_eq!(writer.flush_count(), 0);
    }
}
