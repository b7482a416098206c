//! Standard stream writers
//!
//! Direct, unbuffered writes to the process's stderr or stdout. The stream
//! lock is held for the duration of one write so concurrent records do not
//! interleave.

use crate::core::Writer;
use std::io::Write;

#[derive(Debug, Default, Clone, Copy)]
pub struct StderrWriter;

impl StderrWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Writer for StderrWriter {
    fn write(&self, data: &[u8]) {
        let _ = std::io::stderr().lock().write_all(data);
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }

    fn name(&self) -> &str {
        "stderr"
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutWriter;

impl StdoutWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Writer for StdoutWriter {
    fn write(&self, data: &[u8]) {
        let _ = std::io::stdout().lock().write_all(data);
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }

    fn name(&self) -> &str {
        "stdout"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_writers_accept_bytes() {
        StderrWriter::new().write(b"");
        StdoutWriter::new().write(b"");
        StderrWriter::new().flush();
        StdoutWriter::new().flush();
        assert_eq!(StderrWriter::new().name(), "stderr");
        assert_eq!(StdoutWriter::new().name(), "stdout");
    }
}
