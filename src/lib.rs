//! # glog
//!
//! Leveled, structured logging with a size-rotated file sink.
//!
//! ## Features
//!
//! - **Leveled**: panic, fatal, error, warning, info and debug, with a
//!   threshold that can be changed at runtime
//! - **Structured**: ordered key/value fields carried on immutable entry chains
//! - **Caller attribution**: optional `func=`/`file=` for the code that logged
//! - **Pooled**: entries and render buffers are reused across calls
//! - **Rotating files**: size-capped live file, timestamped backups, background
//!   pruning and gzip compression
//!
//! ```
//! use glog::prelude::*;
//!
//! let sink = MemorySink::new();
//! let logger = Logger::builder().output(sink.clone()).build();
//!
//! logger.debug("x");
//! logger.with_field("user", "a").info("hello");
//!
//! let out = sink.contents_string();
//! assert!(out.contains("[INFO] user= a _msg= hello\n"));
//! assert!(!out.contains("_msg= x"));
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        global, init, Caller, Entry, Field, FieldValue, Formatter, Level, Logger, LoggerBuilder,
        LoggerError, Result, TextFormatter,
    };
    pub use crate::sinks::{MemorySink, Output, RotatingFileConfig, RotatingFileSink};
}

pub use crate::core::{
    default_buffer_pool, global, init, BufferPool, Callable, Caller, CallerFrameFn, Context,
    Entry, ExitFn, Field, FieldValue, Formatter, Level, Logger, LoggerBuilder, LoggerError, Pool,
    Pooled, Reset, Result, TextFormatter, DEFAULT_TIMESTAMP_FORMAT, ERROR_KEY, EXIT_CODE,
    FIELD_KEY_FILE, FIELD_KEY_FUNC, FIELD_KEY_LEVEL, FIELD_KEY_MSG, FIELD_KEY_TIME,
};
pub use crate::sinks::{MemorySink, Output, RotatingFileConfig, RotatingFileSink};
