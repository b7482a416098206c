//! Lock-free ring buffer writer
//!
//! Writers reserve space with a compare-and-swap on `write_pos`, copy their
//! bytes into the ring, then advance `publish_pos` in reservation order. A
//! single flusher at a time (guarded by an atomic flag) forwards the span
//! `[commit_pos, publish_pos)` to the target and advances `commit_pos`.
//!
//! Cursors grow monotonically; the ring index is `pos & (capacity - 1)`.
//! At every observable instant `commit_pos <= publish_pos <= write_pos` and
//! `write_pos - commit_pos <= capacity`.

use crate::core::{LoggerError, Result, Writer};
use crossbeam_utils::{Backoff, CachePadded};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFreeConfig {
    /// Requested ring size, rounded up to a power of two
    pub buffer_size: usize,
    /// Unflushed bytes above which a writer attempts a non-blocking flush
    pub flush_threshold: usize,
    /// Give up acquiring the flush flag after this many backoff rounds.
    /// `None` waits indefinitely.
    pub max_flush_spins: Option<u32>,
}

impl Default for LockFreeConfig {
    fn default() -> Self {
        Self {
            buffer_size: 64 * 1024,
            flush_threshold: 32 * 1024,
            max_flush_spins: None,
        }
    }
}

impl LockFreeConfig {
    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_flush_spins(mut self, spins: Option<u32>) -> Self {
        self.max_flush_spins = spins;
        self
    }
}

/// Snapshot of the ring cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingPositions {
    /// Bytes reserved by writers
    pub write: u64,
    /// Bytes fully copied into the ring
    pub published: u64,
    /// Bytes handed to the target
    pub committed: u64,
}

impl RingPositions {
    /// Reserved but not yet flushed
    pub fn unflushed(&self) -> u64 {
        self.write - self.committed
    }
}

/// Releases the flushing flag on drop
struct FlushingGuard<'a>(&'a AtomicBool);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// # Examples
///
/// ```
/// use crashsafe_logger::prelude::*;
/// use crashsafe_logger::writers::{LockFreeConfig, LockFreeWriter};
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemoryWriter::new());
/// let config = LockFreeConfig::default().with_buffer_size(1000).with_flush_threshold(512);
/// let writer = LockFreeWriter::new(sink.clone(), config).unwrap();
/// assert_eq!(writer.capacity(), 1024);
///
/// writer.write(b"queued\n");
/// writer.flush();
/// assert_eq!(sink.contents(), b"queued\n");
/// ```
pub struct LockFreeWriter {
    target: Arc<dyn Writer>,
    ring: Box<[AtomicU8]>,
    mask: u64,
    flush_threshold: u64,
    max_flush_spins: Option<u32>,
    write_pos: CachePadded<AtomicU64>,
    publish_pos: CachePadded<AtomicU64>,
    commit_pos: CachePadded<AtomicU64>,
    flushing: AtomicBool,
    /// Staging area for the flusher; only touched while `flushing` is held
    scratch: Mutex<Vec<u8>>,
}

impl LockFreeWriter {
    /// # Errors
    ///
    /// `InvalidConfiguration` if the buffer size is zero or cannot be rounded
    /// to a power of two, or the threshold exceeds the rounded capacity.
    pub fn new(target: Arc<dyn Writer>, config: LockFreeConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(LoggerError::config(
                "LockFreeWriter",
                "buffer_size must be non-zero",
            ));
        }
        let capacity = config.buffer_size.checked_next_power_of_two().ok_or_else(|| {
            LoggerError::config(
                "LockFreeWriter",
                format!("buffer_size {} is too large", config.buffer_size),
            )
        })?;
        if config.flush_threshold > capacity {
            return Err(LoggerError::config(
                "LockFreeWriter",
                format!(
                    "flush_threshold {} exceeds ring capacity {}",
                    config.flush_threshold, capacity
                ),
            ));
        }

        let ring: Box<[AtomicU8]> = (0..capacity).map(|_| AtomicU8::new(0)).collect();

        Ok(Self {
            target,
            ring,
            mask: capacity as u64 - 1,
            flush_threshold: config.flush_threshold as u64,
            max_flush_spins: config.max_flush_spins,
            write_pos: CachePadded::new(AtomicU64::new(0)),
            publish_pos: CachePadded::new(AtomicU64::new(0)),
            commit_pos: CachePadded::new(AtomicU64::new(0)),
            flushing: AtomicBool::new(false),
            scratch: Mutex::new(Vec::with_capacity(capacity)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.ring.len()
    }

    /// Bytes reserved but not yet handed to the target
    pub fn pending(&self) -> usize {
        self.positions().unflushed() as usize
    }

    pub fn positions(&self) -> RingPositions {
        let committed = self.commit_pos.load(Ordering::Acquire);
        let published = self.publish_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        RingPositions {
            write,
            published,
            committed,
        }
    }

    /// Drain published bytes unless another flush is already running.
    /// Returns `false` if the flush was skipped.
    pub fn try_flush(&self) -> bool {
        match self.try_acquire_flushing() {
            Some(_guard) => {
                self.drain();
                true
            }
            None => false,
        }
    }

    /// Drain published bytes, waiting for any running flush to finish.
    /// Returns `false` only if `max_flush_spins` ran out first.
    pub fn flush_blocking(&self) -> bool {
        match self.acquire_flushing() {
            Some(_guard) => {
                self.drain();
                true
            }
            None => false,
        }
    }

    fn try_acquire_flushing(&self) -> Option<FlushingGuard<'_>> {
        self.flushing
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| FlushingGuard(&self.flushing))
    }

    fn acquire_flushing(&self) -> Option<FlushingGuard<'_>> {
        let backoff = Backoff::new();
        let mut spins: u32 = 0;
        loop {
            if let Some(guard) = self.try_acquire_flushing() {
                return Some(guard);
            }
            if let Some(max) = self.max_flush_spins {
                if spins >= max {
                    return None;
                }
            }
            spins = spins.saturating_add(1);
            backoff.snooze();
        }
    }

    fn acquire_flushing_until(&self, deadline: Instant) -> Option<FlushingGuard<'_>> {
        let backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_acquire_flushing() {
                return Some(guard);
            }
            if Instant::now() >= deadline {
                return None;
            }
            backoff.snooze();
        }
    }

    /// Caller must hold the flushing flag
    fn drain(&self) {
        self.drain_with(|bytes| {
            self.target.write(bytes);
            true
        });
    }

    /// Forward the published span through `write`. Commits only what
    /// `write` accepted. Caller must hold the flushing flag.
    fn drain_with(&self, write: impl Fn(&[u8]) -> bool) -> bool {
        let commit = self.commit_pos.load(Ordering::Acquire);
        let publish = self.publish_pos.load(Ordering::Acquire);
        if commit == publish {
            return true;
        }

        let start = (commit & self.mask) as usize;
        let len = (publish - commit) as usize;
        let first = len.min(self.ring.len() - start);

        let mut scratch = self.scratch.lock();
        scratch.clear();
        scratch.extend(self.ring[start..start + first].iter().map(|b| b.load(Ordering::Relaxed)));
        if !write(&scratch) {
            return false;
        }

        if first < len {
            scratch.clear();
            scratch.extend(self.ring[..len - first].iter().map(|b| b.load(Ordering::Relaxed)));
            if !write(&scratch) {
                self.commit_pos.store(commit + first as u64, Ordering::Release);
                return false;
            }
        }

        self.commit_pos.store(publish, Ordering::Release);
        true
    }

    fn drain_until(&self, deadline: Instant) -> bool {
        match self.acquire_flushing_until(deadline) {
            Some(_guard) => self.drain_with(|bytes| {
                self.target
                    .write_on_crash(bytes, deadline.saturating_duration_since(Instant::now()))
            }),
            None => false,
        }
    }

    fn write_bypass(&self, data: &[u8]) {
        let Some(_guard) = self.acquire_flushing() else {
            self.target.write(data);
            return;
        };
        self.drain();
        self.target.write(data);
    }

    /// Reserve `len` bytes, returning the start cursor
    fn reserve(&self, len: u64) -> u64 {
        let capacity = self.ring.len() as u64;
        loop {
            // commit first so write - commit cannot underflow
            let commit = self.commit_pos.load(Ordering::Acquire);
            let write = self.write_pos.load(Ordering::Acquire);

            if write - commit + len > capacity {
                self.flush_blocking();
                continue;
            }

            if self
                .write_pos
                .compare_exchange_weak(write, write + len, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return write;
            }
        }
    }

    fn publish(&self, start: u64, end: u64) {
        let backoff = Backoff::new();
        while self.publish_pos.load(Ordering::Acquire) != start {
            backoff.snooze();
        }
        self.publish_pos.store(end, Ordering::Release);
    }
}

impl Writer for LockFreeWriter {
    fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        if data.len() > self.ring.len() {
            self.write_bypass(data);
            return;
        }

        let len = data.len() as u64;
        let start = self.reserve(len);
        for (i, byte) in data.iter().enumerate() {
            let idx = ((start + i as u64) & self.mask) as usize;
            self.ring[idx].store(*byte, Ordering::Relaxed);
        }
        self.publish(start, start + len);

        let commit = self.commit_pos.load(Ordering::Acquire);
        let write = self.write_pos.load(Ordering::Acquire);
        if write - commit > self.flush_threshold {
            self.try_flush();
        }
    }

    fn flush(&self) {
        // drain until everything reserved before this call is committed
        let target_pos = self.write_pos.load(Ordering::Acquire);
        while self.commit_pos.load(Ordering::Acquire) < target_pos {
            if !self.flush_blocking() {
                break;
            }
            if self.publish_pos.load(Ordering::Acquire) < target_pos {
                std::thread::yield_now();
            }
        }
        self.target.flush();
    }

    fn name(&self) -> &str {
        "lock_free"
    }

    /// Bypasses the ring: published bytes are drained, then `data` goes
    /// straight to the target
    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        self.drain_until(deadline)
            && self
                .target
                .write_on_crash(data, deadline.saturating_duration_since(Instant::now()))
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let drained = self.drain_until(deadline);
        let flushed = self
            .target
            .flush_on_crash(deadline.saturating_duration_since(Instant::now()));
        drained && flushed
    }
}

impl Drop for LockFreeWriter {
    fn drop(&mut self) {
        self.drain();
        self.target.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writers::MemoryWriter;

    fn ring_writer(buffer_size: usize, threshold: usize) -> (Arc<MemoryWriter>, LockFreeWriter) {
        let sink = Arc::new(MemoryWriter::new());
        let config = LockFreeConfig::default()
            .with_buffer_size(buffer_size)
            .with_flush_threshold(threshold);
        let writer = LockFreeWriter::new(sink.clone(), config).unwrap();
        (sink, writer)
    }

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let (_, writer) = ring_writer(100, 64);
        assert_eq!(writer.capacity(), 128);

        let (_, writer) = ring_writer(16, 8);
        assert_eq!(writer.capacity(), 16);
    }

    #[test]
    fn test_invalid_configuration() {
        let sink: Arc<dyn Writer> = Arc::new(MemoryWriter::new());
        let zero = LockFreeConfig::default().with_buffer_size(0);
        assert!(LockFreeWriter::new(sink.clone(), zero).is_err());

        let threshold = LockFreeConfig::default()
            .with_buffer_size(16)
            .with_flush_threshold(17);
        assert!(LockFreeWriter::new(sink, threshold).is_err());
    }

    #[test]
    fn test_threshold_triggers_flush() {
        // 16 byte ring, threshold 8: two 10 byte writes
        let (sink, writer) = ring_writer(16, 8);

        writer.write(b"0123456789");
        assert!(writer.pending() <= 16);
        assert_eq!(sink.contents(), b"0123456789");

        writer.write(b"abcdefghij");
        assert!(writer.pending() <= 16);

        writer.flush();
        assert_eq!(sink.contents(), b"0123456789abcdefghij");
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_full_ring_flushes_before_reserving() {
        let (sink, writer) = ring_writer(16, 16);

        writer.write(b"0123456789");
        assert!(sink.contents().is_empty());

        writer.write(b"abcdefghij");
        assert_eq!(sink.contents(), b"0123456789");
        assert_eq!(writer.pending(), 10);

        let positions = writer.positions();
        assert_eq!(positions.write, 20);
        assert_eq!(positions.committed, 10);
        assert!(positions.unflushed() <= 16);
    }

    #[test]
    fn test_wrapping_span_is_split() {
        let (sink, writer) = ring_writer(8, 8);

        writer.write(b"abcdef");
        writer.flush();
        sink.clear();

        // starts at index 6, wraps after two bytes
        writer.write(b"ghijk");
        writer.flush();

        assert_eq!(sink.chunks(), vec![b"gh".to_vec(), b"ijk".to_vec()]);
    }

    #[test]
    fn test_oversized_write_bypasses_ring() {
        let (sink, writer) = ring_writer(8, 8);

        writer.write(b"abc");
        writer.write(b"0123456789abcdef");

        assert_eq!(sink.chunks(), vec![b"abc".to_vec(), b"0123456789abcdef".to_vec()]);
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_try_flush_skips_when_flag_held() {
        let (sink, writer) = ring_writer(64, 64);
        writer.write(b"held");

        let guard = writer.try_acquire_flushing().unwrap();
        assert!(!writer.try_flush());
        drop(guard);

        assert!(writer.try_flush());
        assert_eq!(sink.contents(), b"held");
    }

    #[test]
    fn test_crash_flush_gives_up_when_flag_held() {
        let (sink, writer) = ring_writer(64, 64);
        let wait = Duration::from_millis(20);
        writer.write(b"held ");

        let guard = writer.try_acquire_flushing().unwrap();
        assert!(!writer.flush_on_crash(wait));
        assert!(!writer.write_on_crash(b"fatal", wait));
        drop(guard);
        assert_eq!(writer.pending(), 5);

        assert!(writer.write_on_crash(b"fatal", wait));
        assert_eq!(sink.chunks(), vec![b"held ".to_vec(), b"fatal".to_vec()]);
        assert!(writer.flush_on_crash(wait));
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_bounded_spins_give_up() {
        let sink = Arc::new(MemoryWriter::new());
        let config = LockFreeConfig::default()
            .with_buffer_size(64)
            .with_flush_threshold(64)
            .with_max_flush_spins(Some(3));
        let writer = LockFreeWriter::new(sink, config).unwrap();

        let _guard = writer.try_acquire_flushing().unwrap();
        assert!(!writer.flush_blocking());
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let sink = Arc::new(MemoryWriter::new());
        let config = LockFreeConfig::default()
            .with_buffer_size(256)
            .with_flush_threshold(128);
        let writer = Arc::new(LockFreeWriter::new(sink.clone(), config).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let writer = Arc::clone(&writer);
                std::thread::spawn(move || {
                    for i in 0..200 {
                        writer.write(format!("{}:{:03}\n", t, i).as_bytes());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        writer.flush();

        let output = sink.contents_string();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 800);
        for t in 0..4 {
            let mine: Vec<&str> = lines
                .iter()
                .copied()
                .filter(|l| l.starts_with(&format!("{}:", t)))
                .collect();
            let expected: Vec<String> = (0..200).map(|i| format!("{}:{:03}", t, i)).collect();
            assert_eq!(mine, expected);
        }
    }
}
