//! Fan-out writer

use crate::core::Writer;
use std::sync::Arc;
use std::time::Duration;

/// Forwards every write and flush to each child in order
///
/// # Examples
///
/// ```
/// use crashsafe_logger::prelude::*;
/// use crashsafe_logger::writers::MultiWriter;
/// use std::sync::Arc;
///
/// let a = Arc::new(MemoryWriter::new());
/// let b = Arc::new(MemoryWriter::new());
/// let multi = MultiWriter::new(vec![a.clone(), b.clone()]);
///
/// multi.write(b"both\n");
/// assert_eq!(a.contents(), b.contents());
/// ```
#[derive(Default)]
pub struct MultiWriter {
    writers: Vec<Arc<dyn Writer>>,
}

impl MultiWriter {
    pub fn new(writers: Vec<Arc<dyn Writer>>) -> Self {
        Self { writers }
    }

    pub fn push(&mut self, writer: Arc<dyn Writer>) {
        self.writers.push(writer);
    }

    pub fn len(&self) -> usize {
        self.writers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writers.is_empty()
    }
}

impl Writer for MultiWriter {
    fn write(&self, data: &[u8]) {
        for writer in &self.writers {
            writer.write(data);
        }
    }

    fn flush(&self) {
        for writer in &self.writers {
            writer.flush();
        }
    }

    fn name(&self) -> &str {
        "multi"
    }

    /// Every child gets the full `wait`; returns `false` if any gave up
    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        self.writers
            .iter()
            .fold(true, |ok, writer| writer.write_on_crash(data, wait) && ok)
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        self.writers
            .iter()
            .fold(true, |ok, writer| writer.flush_on_crash(wait) && ok)
    }
}
