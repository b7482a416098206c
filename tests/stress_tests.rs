//! Stress tests for concurrent logging
//!
//! These tests verify:
//! - A shared logger emits every record exactly once, whole
//! - Buffered backends lose nothing under many writer threads
//! - Child loggers on many threads serialize through the shared lock

use crashsafe_logger::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn spawn_writers<F>(work: F)
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let work = Arc::clone(&work);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                work(t);
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("writer thread panicked");
    }
}

/// Every line is `<thread>:<seq>`; each must appear exactly once and each
/// thread's sequence must be increasing
fn assert_complete(output: &str, strip_prefix: &str) {
    let mut seen = HashSet::new();
    let mut last = vec![None; THREADS];
    for line in output.lines() {
        let body = line
            .strip_prefix(strip_prefix)
            .unwrap_or_else(|| panic!("unexpected line: {:?}", line));
        let (t, seq) = body.split_once(':').expect("malformed line");
        let t: usize = t.parse().unwrap();
        let seq: usize = seq.parse().unwrap();

        assert!(seen.insert((t, seq)), "duplicate line {}", line);
        if let Some(prev) = last[t] {
            assert!(seq > prev, "thread {} reordered: {} after {}", t, seq, prev);
        }
        last[t] = Some(seq);
    }
    assert_eq!(seen.len(), THREADS * PER_THREAD);
}

#[test]
fn test_shared_logger_under_contention() {
    let sink = Arc::new(MemoryWriter::new());
    let logger = Logger::builder()
        .timestamps(false)
        .writer(sink.clone())
        .build()
        .unwrap();

    let shared = logger.clone();
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            shared.info(&format!("{}:{}", t, i));
        }
    });

    assert_complete(&sink.contents_string(), "[INFO] ");
    assert_eq!(sink.write_count(), THREADS * PER_THREAD);
    assert_eq!(logger.metrics().total_logged(), (THREADS * PER_THREAD) as u64);
}

#[test]
fn test_lock_free_writer_under_contention() {
    let sink = Arc::new(MemoryWriter::new());
    let config = LockFreeConfig::default()
        .with_buffer_size(4096)
        .with_flush_threshold(2048);
    let writer = Arc::new(LockFreeWriter::new(sink.clone(), config).unwrap());

    let shared = Arc::clone(&writer);
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            shared.write(format!("{}:{}\n", t, i).as_bytes());
        }
    });
    writer.flush();

    assert_complete(&sink.contents_string(), "");
    assert_eq!(writer.pending(), 0);
}

#[test]
fn test_lock_free_tiny_ring_with_bounded_spins() {
    let sink = Arc::new(MemoryWriter::new());
    let config = LockFreeConfig::default()
        .with_buffer_size(64)
        .with_flush_threshold(32)
        .with_max_flush_spins(Some(16));
    let writer = Arc::new(LockFreeWriter::new(sink.clone(), config).unwrap());

    let shared = Arc::clone(&writer);
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            shared.write(format!("{}:{}\n", t, i).as_bytes());
        }
    });
    writer.flush();

    assert_complete(&sink.contents_string(), "");
}

#[test]
fn test_async_writer_under_contention() {
    let sink = Arc::new(MemoryWriter::new());
    let writer = Arc::new(AsyncWriter::new(sink.clone(), 512, 256).unwrap());

    let shared = Arc::clone(&writer);
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            shared.write(format!("{}:{}\n", t, i).as_bytes());
        }
    });
    writer.flush();

    assert_complete(&sink.contents_string(), "");
    assert_eq!(writer.buffered_len(), 0);
}

#[test]
fn test_thread_local_writer_under_contention() {
    let sink = Arc::new(MemoryWriter::new());
    let writer = Arc::new(ThreadLocalWriter::new(sink.clone(), 256).unwrap());

    let shared = Arc::clone(&writer);
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            shared.write(format!("{}:{}\n", t, i).as_bytes());
        }
        shared.release_current_thread();
    });

    assert_eq!(writer.claimed_slots(), 0);
    assert_complete(&sink.contents_string(), "");
}

#[test]
fn test_child_loggers_across_threads() {
    let sink = Arc::new(MemoryWriter::new());
    let root = Logger::builder()
        .timestamps(false)
        .modules(false)
        .writer(sink.clone())
        .build()
        .unwrap();

    let shared = root.clone();
    spawn_writers(move |t| {
        let child = shared
            .with_scope(&format!("worker{}", t))
            .with_fields(&[Field::new("t", t as u64)]);
        for i in 0..PER_THREAD {
            child.info(&format!("{}:{}", t, i));
        }
    });

    let output = sink.contents_string();
    let stripped: String = output
        .lines()
        .map(|line| {
            let end = line.rfind(" t=").expect("bound field present");
            format!("{}\n", &line[..end])
        })
        .collect();
    assert_complete(&stripped, "[INFO] ");
}

#[test]
fn test_level_changes_while_logging() {
    let sink = Arc::new(MemoryWriter::new());
    let logger = Logger::builder()
        .timestamps(false)
        .writer(sink.clone())
        .build()
        .unwrap();

    let shared = logger.clone();
    spawn_writers(move |t| {
        for i in 0..PER_THREAD {
            if t == 0 && i % 50 == 0 {
                let next = if (i / 50) % 2 == 0 { LogLevel::Error } else { LogLevel::Info };
                shared.set_level(next);
            }
            shared.warn("w");
        }
    });

    let metrics = logger.metrics();
    assert_eq!(
        metrics.total_logged() + metrics.filtered_count(),
        (THREADS * PER_THREAD) as u64
    );
    assert_eq!(sink.write_count() as u64, metrics.total_logged());
}
