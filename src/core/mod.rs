//! Core logger types and traits

pub mod caller;
pub mod error;
pub mod field;
pub mod formatter;
pub mod log_entry;
pub mod log_level;
pub mod logger;
pub mod pool;

pub use caller::Caller;
pub use error::{LoggerError, Result};
pub use field::{Callable, Field, FieldValue, ERROR_KEY};
pub use formatter::{
    CallerFrameFn, Formatter, TextFormatter, DEFAULT_TIMESTAMP_FORMAT, FIELD_KEY_FILE,
    FIELD_KEY_FUNC, FIELD_KEY_LEVEL, FIELD_KEY_MSG, FIELD_KEY_TIME,
};
pub use log_entry::{Context, Entry};
pub use log_level::Level;
pub use logger::{global, init, ExitFn, Logger, LoggerBuilder, EXIT_CODE};
pub use pool::{default_buffer_pool, BufferPool, Pool, Pooled, Reset};
