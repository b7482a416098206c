//! File logging example
//!
//! Demonstrates plain, buffered and rotating file writers, with the
//! buffered one registered for crash-time flushing.
//!
//! Run with: cargo run --example file_logging

use crashsafe_logger::core::crash;
use crashsafe_logger::prelude::*;
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Crashsafe Logger - File Logging Example ===\n");

    let log_dir = std::env::temp_dir().join("crashsafe_logger_demo");

    crash::init(CrashConfig::default())?;

    let plain: Arc<dyn Writer> = Arc::new(FileWriter::new(log_dir.join("plain.log"))?);
    let buffered: Arc<dyn Writer> =
        Arc::new(BufferedFileWriter::with_capacity(log_dir.join("buffered.log"), 16 * 1024)?);
    let policy = RotationPolicy::new()
        .with_max_size(4 * 1024)
        .with_max_backups(3)
        .with_compression(true);
    let rotating: Arc<dyn Writer> =
        Arc::new(RotatingFileWriter::with_policy(log_dir.join("rotating.log"), policy)?);

    // buffered bytes reach disk even if the process panics
    let _guard = crash::register_guarded(buffered.clone())?;

    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .format(OutputFormat::Json)
        .module("file_demo")
        .writer(plain)
        .writer(buffered)
        .writer(rotating)
        .build()?;
    crash::set_global_logger(logger.clone())?;

    println!("Writing 200 records to {}", log_dir.display());
    for i in 0..200 {
        logger.info_with(
            "processing item",
            &[Field::new("item", i), Field::new("even", i % 2 == 0)],
        );
    }
    logger.error("an error record flushes every writer immediately");

    logger.flush();
    println!("Files:");
    if let Ok(entries) = std::fs::read_dir(&log_dir) {
        for entry in entries.flatten() {
            println!("  {}", entry.path().display());
        }
    }

    crash::shutdown();
    println!("\n=== Example completed successfully! ===");

    Ok(())
}
