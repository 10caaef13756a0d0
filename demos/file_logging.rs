//! File logging example
//!
//! Demonstrates logging into a size-rotated file with pruned, compressed
//! backups.
//!
//! Run with: cargo run --example file_logging

use glog::prelude::*;
use std::path::PathBuf;

fn main() -> Result<()> {
    println!("=== glog - File Logging Example ===\n");

    let dir = PathBuf::from("logs");
    let sink = RotatingFileSink::new(
        RotatingFileConfig::new(dir.join("application.log"))
            .with_max_bytes(4 * 1024)
            .with_max_backups(3)
            .with_max_age(7)
            .with_compress(true),
    );

    let logger = Logger::builder()
        .level(Level::Debug)
        .output(sink.clone())
        .build();

    println!("1. Writing enough to rotate a few times:");
    logger.info("Application started");
    for i in 1..=200 {
        logger
            .with_field("item", i)
            .with_field("batch", i / 50)
            .infof(format_args!("Processing item {}/200", i));
        if i % 75 == 0 {
            logger.with_field("item", i).warn("Item took longer than expected");
        }
    }
    logger.info("All operations completed");
    logger.flush()?;

    println!("   live file holds {} bytes", sink.current_size());

    println!("\n2. Forcing a rotation and an immediate retention pass:");
    sink.rotate()?;
    sink.run_retention()?;
    sink.close()?;

    println!("\n=== Example completed successfully! ===");
    println!("Check '{}' for the live file and its backups", dir.display());

    Ok(())
}
