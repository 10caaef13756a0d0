//! Main logger implementation

use super::{
    error::Result,
    field::{Field, FieldValue},
    formatter::{Formatter, TextFormatter},
    log_entry::{Context, Entry},
    log_level::Level,
    pool::{BufferPool, Pool, Pooled},
};
use crate::sinks::Output;
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fmt;
use std::io::Write;
use std::panic::Location;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

/// Code passed to the exit hook by fatal-level calls.
pub const EXIT_CODE: i32 = 1;

/// Locations in this file are never reported as callers.
pub(crate) const SOURCE_FILE: &str = file!();

/// Process-exit hook invoked after a fatal entry is written.
pub type ExitFn = Arc<dyn Fn(i32) + Send + Sync>;

fn process_exit() -> ExitFn {
    Arc::new(|code| std::process::exit(code))
}

/// Everything swapped under the logger's lock. Writes hold the same lock, so
/// a write sees either the old or the new configuration, never a mix.
struct Config {
    formatter: Arc<dyn Formatter>,
    output: Output,
    report_caller: bool,
    exit_fn: ExitFn,
}

struct Inner {
    level: AtomicU8,
    config: Mutex<Config>,
    buffer_pool: Option<Arc<BufferPool>>,
    entries: Pool<Entry>,
}

/// Cheaply cloneable handle; clones share configuration, output and pools.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

impl Logger {
    /// Logger writing text to stderr at info level.
    #[must_use]
    pub fn new() -> Self {
        LoggerBuilder::new().build()
    }

    /// Create a builder for Logger
    ///
    /// # Example
    /// ```
    /// use glog::prelude::*;
    ///
    /// let logger = Logger::builder()
    ///     .level(Level::Debug)
    ///     .report_caller(true)
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn acquire(&self) -> Pooled<'_, Entry> {
        let mut entry = self.inner.entries.get();
        entry.attach(self);
        entry
    }

    pub fn with_field<K, V>(&self, key: K, value: V) -> Entry
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.acquire().with_field(key, value)
    }

    pub fn with_fields<I>(&self, fields: I) -> Entry
    where
        I: IntoIterator<Item = Field>,
    {
        self.acquire().with_fields(fields)
    }

    pub fn with_error(&self, err: &dyn std::error::Error) -> Entry {
        self.acquire().with_error(err)
    }

    pub fn with_context(&self, context: Context) -> Entry {
        self.acquire().with_context(context)
    }

    pub fn with_time(&self, time: DateTime<Local>) -> Entry {
        self.acquire().with_time(time)
    }

    #[track_caller]
    pub fn log(&self, level: Level, msg: impl fmt::Display) {
        self.log_in(level, None, msg);
    }

    #[track_caller]
    pub fn logf(&self, level: Level, args: fmt::Arguments<'_>) {
        self.log_in(level, None, args);
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn log_in(&self, level: Level, function: Option<&str>, msg: impl fmt::Display) {
        if !self.is_level_enabled(level) {
            return;
        }
        let location = Location::caller();
        self.acquire().emit(level, msg, location, function);
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn fatal_in(&self, function: Option<&str>, msg: impl fmt::Display) {
        self.log_in(Level::Fatal, function, msg);
        self.exit();
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, msg: impl fmt::Display) {
        self.log_in(Level::Debug, None, msg);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, msg: impl fmt::Display) {
        self.log_in(Level::Info, None, msg);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, msg: impl fmt::Display) {
        self.log_in(Level::Warn, None, msg);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, msg: impl fmt::Display) {
        self.log_in(Level::Warn, None, msg);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, msg: impl fmt::Display) {
        self.log_in(Level::Error, None, msg);
    }

    /// Logs at fatal level, then calls the exit hook, whether or not the
    /// entry itself passed the level check.
    #[track_caller]
    pub fn fatal(&self, msg: impl fmt::Display) {
        self.fatal_in(None, msg);
    }

    /// Logs at panic level and unwinds with the entry as payload.
    ///
    /// ```
    /// use glog::prelude::*;
    ///
    /// let logger = Logger::builder().output(MemorySink::new()).build();
    /// let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
    ///     logger.panic("unrecoverable")
    /// }));
    /// let entry = caught.unwrap_err().downcast::<Entry>().unwrap();
    /// assert_eq!(entry.message(), "unrecoverable");
    /// ```
    #[track_caller]
    pub fn panic(&self, msg: impl fmt::Display) {
        self.log_in(Level::Panic, None, msg);
    }

    #[inline]
    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Debug, None, args);
    }

    #[inline]
    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Info, None, args);
    }

    #[inline]
    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Warn, None, args);
    }

    #[inline]
    #[track_caller]
    pub fn warningf(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Warn, None, args);
    }

    #[inline]
    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Error, None, args);
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.fatal_in(None, args);
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) {
        self.log_in(Level::Panic, None, args);
    }

    /// Invoke the exit hook with [`EXIT_CODE`].
    pub fn exit(&self) {
        let exit_fn = Arc::clone(&self.inner.config.lock().exit_fn);
        exit_fn(EXIT_CODE);
    }

    #[inline]
    pub fn is_level_enabled(&self, level: Level) -> bool {
        Level::is_enabled(self.get_level(), level)
    }

    #[inline]
    pub fn get_level(&self) -> Level {
        Level::from_u8(self.inner.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.inner.level.store(level.as_u8(), Ordering::Relaxed);
    }

    pub fn set_formatter<F: Formatter + 'static>(&self, formatter: F) {
        self.inner.config.lock().formatter = Arc::new(formatter);
    }

    pub fn set_output(&self, output: impl Into<Output>) {
        self.inner.config.lock().output = output.into();
    }

    pub fn set_report_caller(&self, report_caller: bool) {
        self.inner.config.lock().report_caller = report_caller;
    }

    pub fn set_exit_fn<F>(&self, exit_fn: F)
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.inner.config.lock().exit_fn = Arc::new(exit_fn);
    }

    pub fn formatter(&self) -> Arc<dyn Formatter> {
        Arc::clone(&self.inner.config.lock().formatter)
    }

    pub fn report_caller(&self) -> bool {
        self.inner.config.lock().report_caller
    }

    /// The logger's own buffer pool, if one was configured.
    pub fn buffer_pool(&self) -> Option<&BufferPool> {
        self.inner.buffer_pool.as_deref()
    }

    /// Flush the configured output.
    pub fn flush(&self) -> Result<()> {
        self.inner.config.lock().output.flush()?;
        Ok(())
    }

    /// Format and write under the logger's lock. Failures are reported on
    /// stderr and the entry is dropped.
    pub(crate) fn write_entry(&self, entry: &mut Entry, buf: &mut Vec<u8>) {
        let mut config = self.inner.config.lock();
        entry.set_stderr_destination(config.output.is_stderr());

        buf.clear();
        if let Err(e) = config.formatter.format(entry, buf) {
            eprintln!("[LOGGER ERROR] Failed to format log entry: {}", e);
            return;
        }
        if let Err(e) = config.output.write_all(buf) {
            eprintln!("[LOGGER ERROR] Failed to write to log: {}", e);
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.get_level())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use glog::prelude::*;
///
/// let sink = MemorySink::new();
/// let logger = Logger::builder()
///     .level(Level::Debug)
///     .formatter(TextFormatter::new().with_disable_color(true))
///     .output(sink.clone())
///     .exit_fn(|code| eprintln!("exit requested with {}", code))
///     .build();
///
/// logger.debug("ready");
/// assert!(sink.contents_string().contains("_msg= ready"));
/// ```
pub struct LoggerBuilder {
    level: Level,
    formatter: Arc<dyn Formatter>,
    output: Output,
    report_caller: bool,
    buffer_pool: Option<Arc<BufferPool>>,
    exit_fn: ExitFn,
}

impl LoggerBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            level: Level::Info,
            formatter: Arc::new(TextFormatter::new()),
            output: Output::Stderr,
            report_caller: false,
            buffer_pool: None,
            exit_fn: process_exit(),
        }
    }

    /// Set the threshold level
    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn formatter<F: Formatter + 'static>(mut self, formatter: F) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn output(mut self, output: impl Into<Output>) -> Self {
        self.output = output.into();
        self
    }

    /// Record the call site of every entry
    #[must_use = "builder methods return a new value"]
    pub fn report_caller(mut self, report_caller: bool) -> Self {
        self.report_caller = report_caller;
        self
    }

    /// Use a dedicated buffer pool instead of the shared default one
    #[must_use = "builder methods return a new value"]
    pub fn buffer_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.buffer_pool = Some(pool);
        self
    }

    /// Replace the process-exit hook used by fatal-level calls
    #[must_use = "builder methods return a new value"]
    pub fn exit_fn<F>(mut self, exit_fn: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_fn = Arc::new(exit_fn);
        self
    }

    /// Build the Logger
    pub fn build(self) -> Logger {
        Logger {
            inner: Arc::new(Inner {
                level: AtomicU8::new(self.level.as_u8()),
                config: Mutex::new(Config {
                    formatter: self.formatter,
                    output: self.output,
                    report_caller: self.report_caller,
                    exit_fn: self.exit_fn,
                }),
                buffer_pool: self.buffer_pool,
                entries: Pool::new(Entry::detached),
            }),
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: OnceLock<Logger> = OnceLock::new();

/// Install the process-wide logger.
///
/// The first call builds the logger; concurrent callers block until it is
/// fully constructed. Later calls ignore their builder and return the
/// existing instance.
pub fn init(builder: LoggerBuilder) -> &'static Logger {
    GLOBAL.get_or_init(|| builder.build())
}

/// The process-wide logger, built with defaults if [`init`] was never called.
pub fn global() -> &'static Logger {
    GLOBAL.get_or_init(Logger::new)
}
