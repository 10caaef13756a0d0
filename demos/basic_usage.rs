//! Basic logger usage example
//!
//! Demonstrates levels, fields, caller reporting and the process-wide logger.
//!
//! Run with: cargo run --example basic_usage

use glog::prelude::*;
use glog::{info, warn};

fn handle_request(logger: &Logger, id: u32) {
    info!(logger.with_field("request", id), "handling request {}", id);
}

fn main() -> Result<()> {
    println!("=== glog - Basic Usage Example ===\n");

    // Install the process-wide logger; stderr output is colored
    let logger = init(Logger::builder().level(Level::Debug));

    println!("1. Logging at different levels:");
    logger.debug("This is a debug message");
    logger.info("This is an info message");
    logger.warn("This is a warning message");
    logger.error("This is an error message");

    println!("\n2. Raising the threshold to warning:");
    logger.set_level(Level::Warn);
    logger.debug("Debug message (hidden)");
    logger.info("Info message (hidden)");
    logger.warn("Warning message (visible)");
    logger.set_level(Level::Debug);

    println!("\n3. Structured fields:");
    let base = logger.with_field("service", "billing");
    base.with_field("user", "ann").info("signed in");
    base.with_field("user", "bob")
        .with_field("attempts", 3)
        .warn("password rejected");

    let err = std::io::Error::new(std::io::ErrorKind::TimedOut, "upstream timed out");
    logger.with_error(&err).error("charge failed");

    println!("\n4. Caller reporting:");
    logger.set_report_caller(true);
    handle_request(logger, 7);
    warn!(logger, "disk at {}%", 91);
    logger.set_report_caller(false);

    println!("\n5. Same logger through global():");
    global().info("reached through the global handle");

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
