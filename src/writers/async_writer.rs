//! Double-buffered writer
//!
//! Records accumulate in the active buffer; once its fill passes the flush
//! threshold it is written through to the target. When a record does not fit,
//! the buffers swap and the one just retired is drained. Everything happens on
//! the calling thread under one mutex, so "async" here means decoupled from
//! the target's write granularity, not from the caller.

use crate::core::{LoggerError, Result, Writer};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct DoubleBuffer {
    buffers: [Vec<u8>; 2],
    active: usize,
}

impl DoubleBuffer {
    fn drain_into(buffer: &mut Vec<u8>, target: &dyn Writer) {
        if !buffer.is_empty() {
            target.write(buffer);
            buffer.clear();
        }
    }
}

/// # Examples
///
/// ```
/// use crashsafe_logger::prelude::*;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemoryWriter::new());
/// let writer = AsyncWriter::new(sink.clone(), 64, 32).unwrap();
///
/// writer.write(b"buffered\n");
/// assert!(sink.contents().is_empty());
///
/// writer.flush();
/// assert_eq!(sink.contents(), b"buffered\n");
/// ```
pub struct AsyncWriter {
    target: Arc<dyn Writer>,
    buffer_size: usize,
    flush_threshold: usize,
    state: Mutex<DoubleBuffer>,
}

impl AsyncWriter {
    /// Create a writer with two `buffer_size` buffers that drains the active
    /// one once it holds more than `flush_threshold` bytes.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` if `buffer_size` is zero or `flush_threshold`
    /// is larger than `buffer_size`.
    pub fn new(target: Arc<dyn Writer>, buffer_size: usize, flush_threshold: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(LoggerError::config(
                "AsyncWriter",
                "buffer_size must be non-zero",
            ));
        }
        if flush_threshold > buffer_size {
            return Err(LoggerError::config(
                "AsyncWriter",
                format!(
                    "flush_threshold {} exceeds buffer_size {}",
                    flush_threshold, buffer_size
                ),
            ));
        }

        Ok(Self {
            target,
            buffer_size,
            flush_threshold,
            state: Mutex::new(DoubleBuffer {
                buffers: [
                    Vec::with_capacity(buffer_size),
                    Vec::with_capacity(buffer_size),
                ],
                active: 0,
            }),
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Bytes held across both buffers
    pub fn buffered_len(&self) -> usize {
        let state = self.state.lock();
        state.buffers[0].len() + state.buffers[1].len()
    }

    /// Index of the buffer currently accepting writes
    pub fn active_index(&self) -> usize {
        self.state.lock().active
    }

    fn drain(&self, state: &mut DoubleBuffer) {
        // retired buffer first; it holds the older bytes
        let retired = 1 - state.active;
        let active = state.active;
        DoubleBuffer::drain_into(&mut state.buffers[retired], self.target.as_ref());
        DoubleBuffer::drain_into(&mut state.buffers[active], self.target.as_ref());
    }

    /// Like `drain`, but leaves a buffer in place if the target gives up
    fn drain_on_crash(&self, state: &mut DoubleBuffer, wait: Duration) -> bool {
        for idx in [1 - state.active, state.active] {
            let buffer = &mut state.buffers[idx];
            if buffer.is_empty() {
                continue;
            }
            if !self.target.write_on_crash(buffer, wait) {
                return false;
            }
            buffer.clear();
        }
        true
    }
}

impl Writer for AsyncWriter {
    fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let mut state = self.state.lock();

        if data.len() > self.buffer_size {
            self.drain(&mut state);
            self.target.write(data);
            return;
        }

        let active = state.active;
        if state.buffers[active].len() + data.len() <= self.buffer_size {
            let buffer = &mut state.buffers[active];
            buffer.extend_from_slice(data);
            if buffer.len() > self.flush_threshold {
                DoubleBuffer::drain_into(buffer, self.target.as_ref());
            }
            return;
        }

        // swapping only copies; the threshold is checked on the next write
        let next = 1 - active;
        state.active = next;
        DoubleBuffer::drain_into(&mut state.buffers[active], self.target.as_ref());
        state.buffers[next].clear();
        state.buffers[next].extend_from_slice(data);
    }

    fn flush(&self) {
        let mut state = self.state.lock();
        self.drain(&mut state);
        self.target.flush();
    }

    fn name(&self) -> &str {
        "async"
    }

    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        let Some(mut state) = self.state.try_lock_for(wait) else {
            return false;
        };
        self.drain_on_crash(&mut state, wait) && self.target.write_on_crash(data, wait)
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        let Some(mut state) = self.state.try_lock_for(wait) else {
            return false;
        };
        let drained = self.drain_on_crash(&mut state, wait);
        drop(state);
        self.target.flush_on_crash(wait) && drained
    }
}

impl Drop for AsyncWriter {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        let retired = 1 - state.active;
        let active = state.active;
        DoubleBuffer::drain_into(&mut state.buffers[retired], self.target.as_ref());
        DoubleBuffer::drain_into(&mut state.buffers[active], self.target.as_ref());
        self.target.flush();
    }
}
