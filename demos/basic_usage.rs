//! Basic logger usage example
//!
//! Demonstrates console output, levels, formats, structured fields and
//! child loggers.
//!
//! Run with: cargo run --example basic_usage

use crashsafe_logger::prelude::*;
use crashsafe_logger::{fields, info, warn};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("=== Crashsafe Logger - Basic Usage Example ===\n");

    let logger = Logger::builder()
        .level(LogLevel::Debug)
        .module("demo")
        .writer(Arc::new(StdoutWriter::new()))
        .build()?;

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");
    logger.fatal("This is a fatal message (the process keeps running)");

    println!("\n2. Raising the minimum level to WARN:");
    logger.set_level(LogLevel::Warn);
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    logger.warn("Warning message (visible)");
    logger.set_level(LogLevel::Debug);

    println!("\n3. Structured fields and macros:");
    let port = 8080;
    info!(logger, fields!["port" => port, "tls" => true]; "listening on {}", port);
    logger.info_with(
        "user signed in",
        &[Field::new("user_id", 42u64), Field::new("name", "ada")],
    );

    println!("\n4. Child loggers:");
    let request = logger.with_fields(&[Field::new("request_id", "req-7")]);
    let db = request.with_scope("db");
    db.info("query started");
    warn!(db, fields!["ms" => 740]; "slow query");

    println!("\n5. Output formats:");
    logger.set_format(OutputFormat::Json);
    logger.info_with("json record", &[Field::new("ratio", 0.75)]);
    logger.set_format(OutputFormat::Colored);
    logger.warn_with("colored record", &[Field::new("retries", 3)]);

    println!("\n=== Example completed successfully! ===");

    Ok(())
}
