//! Output destinations

pub mod output;
pub mod rotating_file;

pub use output::{MemorySink, Output};
pub use rotating_file::{RotatingFileConfig, RotatingFileSink, BACKUP_TIME_FORMAT, COMPRESS_SUFFIX};
