//! Per-thread buffering writer
//!
//! A fixed table of slots, each claimed by one thread through a
//! compare-and-swap on its owner key. A thread only ever touches its own
//! slot on the write path; bytes reach the target under a shared mutex when
//! a slot fills up or on [`ThreadLocalWriter::flush_all`]. Threads that find
//! the table full write straight through.
//!
//! Lock order is slot buffer, then the shared mutex.

use crate::core::{LoggerError, Result, Writer};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Number of slots in the table
pub const THREAD_SLOTS: usize = 64;

const UNOWNED: u64 = 0;

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_KEY: u64 = NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed);
}

/// Stable non-zero identity of the calling thread
fn current_thread_key() -> u64 {
    THREAD_KEY.with(|key| *key)
}

fn home_slot(key: u64) -> usize {
    (key.wrapping_mul(0x9E37_79B9_7F4A_7C15) >> 32) as usize % THREAD_SLOTS
}

struct Slot {
    owner: AtomicU64,
    buffer: Mutex<Vec<u8>>,
}

/// # Examples
///
/// ```
/// use crashsafe_logger::prelude::*;
/// use crashsafe_logger::writers::ThreadLocalWriter;
/// use std::sync::Arc;
///
/// let sink = Arc::new(MemoryWriter::new());
/// let writer = ThreadLocalWriter::new(sink.clone(), 256).unwrap();
///
/// writer.write(b"local\n");
/// assert_eq!(writer.claimed_slots(), 1);
///
/// writer.flush_all();
/// assert_eq!(sink.contents(), b"local\n");
/// ```
pub struct ThreadLocalWriter {
    target: Arc<dyn Writer>,
    slot_size: usize,
    slots: Box<[Slot]>,
    shared: Mutex<()>,
}

impl ThreadLocalWriter {
    /// # Errors
    ///
    /// `InvalidConfiguration` if `slot_size` is zero.
    pub fn new(target: Arc<dyn Writer>, slot_size: usize) -> Result<Self> {
        if slot_size == 0 {
            return Err(LoggerError::config(
                "ThreadLocalWriter",
                "slot_size must be non-zero",
            ));
        }

        let slots = (0..THREAD_SLOTS)
            .map(|_| Slot {
                owner: AtomicU64::new(UNOWNED),
                buffer: Mutex::new(Vec::with_capacity(slot_size)),
            })
            .collect();

        Ok(Self {
            target,
            slot_size,
            slots,
            shared: Mutex::new(()),
        })
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    /// Number of slots currently owned by some thread
    pub fn claimed_slots(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.owner.load(Ordering::Acquire) != UNOWNED)
            .count()
    }

    /// Bytes buffered in the calling thread's slot
    pub fn buffered_len(&self) -> usize {
        self.owned_slot(current_thread_key())
            .map_or(0, |idx| self.slots[idx].buffer.lock().len())
    }

    /// Write every non-empty slot to the target
    pub fn flush_all(&self) {
        for slot in self.slots.iter() {
            let mut buffer = slot.buffer.lock();
            self.drain(&mut buffer);
        }
    }

    /// Flush the calling thread's slot and give it back to the pool.
    /// Returns `false` if the thread held no slot.
    pub fn release_current_thread(&self) -> bool {
        let key = current_thread_key();
        match self.owned_slot(key) {
            Some(idx) => {
                let slot = &self.slots[idx];
                let mut buffer = slot.buffer.lock();
                self.drain(&mut buffer);
                slot.owner.store(UNOWNED, Ordering::Release);
                true
            }
            None => false,
        }
    }

    fn probe(key: u64) -> impl Iterator<Item = usize> {
        let start = home_slot(key);
        (0..THREAD_SLOTS).map(move |i| (start + i) % THREAD_SLOTS)
    }

    fn owned_slot(&self, key: u64) -> Option<usize> {
        Self::probe(key).find(|&idx| self.slots[idx].owner.load(Ordering::Acquire) == key)
    }

    /// Find the caller's slot, claiming a free one if it has none
    fn acquire_slot(&self, key: u64) -> Option<usize> {
        self.owned_slot(key).or_else(|| {
            Self::probe(key).find(|&idx| {
                self.slots[idx]
                    .owner
                    .compare_exchange(UNOWNED, key, Ordering::AcqRel, Ordering::Relaxed)
                    .is_ok()
            })
        })
    }

    fn drain(&self, buffer: &mut Vec<u8>) {
        if buffer.is_empty() {
            return;
        }
        let _shared = self.shared.lock();
        self.target.write(buffer);
        buffer.clear();
    }

    fn write_direct(&self, data: &[u8]) {
        let _shared = self.shared.lock();
        self.target.write(data);
    }

    fn write_direct_until(&self, data: &[u8], deadline: Instant) -> bool {
        let Some(_shared) = self.shared.try_lock_until(deadline) else {
            return false;
        };
        self.target
            .write_on_crash(data, deadline.saturating_duration_since(Instant::now()))
    }

    fn drain_until(&self, buffer: &mut Vec<u8>, deadline: Instant) -> bool {
        if buffer.is_empty() {
            return true;
        }
        let drained = self.write_direct_until(buffer, deadline);
        if drained {
            buffer.clear();
        }
        drained
    }

    fn drain_slot_until(&self, idx: usize, deadline: Instant) -> bool {
        self.slots[idx]
            .buffer
            .try_lock_until(deadline)
            .is_some_and(|mut buffer| self.drain_until(&mut buffer, deadline))
    }
}

impl Writer for ThreadLocalWriter {
    fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let Some(idx) = self.acquire_slot(current_thread_key()) else {
            self.write_direct(data);
            return;
        };

        let mut buffer = self.slots[idx].buffer.lock();
        if buffer.len() + data.len() > self.slot_size {
            self.drain(&mut buffer);
        }
        if data.len() > self.slot_size {
            self.write_direct(data);
        } else {
            buffer.extend_from_slice(data);
        }
    }

    fn flush(&self) {
        self.flush_all();
        self.target.flush();
    }

    fn name(&self) -> &str {
        "thread_local"
    }

    /// Drains the caller's own slot first so the record lands after it
    fn write_on_crash(&self, data: &[u8], wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let own_drained = self
            .owned_slot(current_thread_key())
            .map_or(true, |idx| self.drain_slot_until(idx, deadline));
        own_drained && self.write_direct_until(data, deadline)
    }

    fn flush_on_crash(&self, wait: Duration) -> bool {
        let deadline = Instant::now() + wait;
        let mut complete = true;
        for idx in 0..THREAD_SLOTS {
            complete &= self.drain_slot_until(idx, deadline);
        }
        let flushed = self
            .target
            .flush_on_crash(deadline.saturating_duration_since(Instant::now()));
        complete && flushed
    }
}

impl Drop for ThreadLocalWriter {
    fn drop(&mut self) {
        self.flush_all();
        self.target.flush();
    }
}
