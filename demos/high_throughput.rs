//! High-throughput example
//!
//! Drives the lock-free ring, thread-local and double-buffered writers from
//! several threads and reports how long each took.
//!
//! Run with: cargo run --example high_throughput

use crashsafe_logger::prelude::*;
use std::sync::Arc;
use std::time::Instant;

const THREADS: usize = 8;
const RECORDS_PER_THREAD: usize = 10_000;

fn run(name: &str, writer: Arc<dyn Writer>) {
    let logger = Logger::builder()
        .format(OutputFormat::Json)
        .sync_on_error(false)
        .writer(writer)
        .build()
        .expect("valid configuration");

    let start = Instant::now();
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logger.with_fields(&[Field::new("thread", t)]);
            std::thread::spawn(move || {
                for i in 0..RECORDS_PER_THREAD {
                    logger.info_with("tick", &[Field::new("seq", i)]);
                }
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.join();
    }
    logger.flush();

    let elapsed = start.elapsed();
    let total = THREADS * RECORDS_PER_THREAD;
    println!(
        "{:<20} {:>8} records in {:>8.2?} ({:.0} records/s, {} dropped)",
        name,
        total,
        elapsed,
        total as f64 / elapsed.as_secs_f64(),
        logger.metrics().dropped_count()
    );
}

fn main() -> Result<()> {
    println!("=== Crashsafe Logger - High Throughput Example ===\n");

    let sink = Arc::new(MemoryWriter::new());

    let config = LockFreeConfig::default()
        .with_buffer_size(256 * 1024)
        .with_flush_threshold(128 * 1024)
        .with_max_flush_spins(Some(1_000));
    run("lock_free_ring", Arc::new(LockFreeWriter::new(sink.clone(), config)?));
    sink.clear();

    run(
        "thread_local",
        Arc::new(ThreadLocalWriter::new(sink.clone(), 32 * 1024)?),
    );
    sink.clear();

    run(
        "async_double_buffer",
        Arc::new(AsyncWriter::new(sink.clone(), 128 * 1024, 64 * 1024)?),
    );

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
