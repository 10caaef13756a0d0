//! Logging macros for ergonomic log message formatting.
//!
//! The macros accept either a [`Logger`](crate::Logger) or an
//! [`Entry`](crate::Entry) chain as their first argument. Unlike the plain
//! methods, they also record the path of the enclosing function, which shows
//! up as `func=` when the logger reports callers.
//!
//! # Examples
//!
//! ```
//! use glog::prelude::*;
//! use glog::info;
//!
//! let sink = MemorySink::new();
//! let logger = Logger::builder().output(sink.clone()).build();
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! info!(logger.with_field("port", port), "listening on port {}", port);
//! assert!(sink.contents_string().contains("port= 8080 _msg= listening on port 8080"));
//! ```

/// Log a message at an explicit level.
///
/// ```
/// # use glog::prelude::*;
/// # let logger = Logger::builder().output(MemorySink::new()).build();
/// use glog::log;
/// log!(logger, Level::Info, "Simple message");
/// log!(logger, Level::Error, "Error code: {}", 500);
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.log_in($level, ::std::option::Option::Some($crate::__function_path!()), format_args!($($arg)+))
    };
}

/// Log a debug-level message.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Debug, $($arg)+)
    };
}

/// Log an info-level message.
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Info, $($arg)+)
    };
}

/// Log a warning-level message.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Warn, $($arg)+)
    };
}

/// Log an error-level message.
#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Error, $($arg)+)
    };
}

/// Log a fatal-level message, then call the logger's exit hook.
///
/// ```
/// # use glog::prelude::*;
/// use glog::fatal;
/// let logger = Logger::builder()
///     .output(MemorySink::new())
///     .exit_fn(|code| assert_eq!(code, 1))
///     .build();
/// fatal!(logger, "Unable to recover from error: {}", "disk full");
/// ```
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $logger.fatal_in(::std::option::Option::Some($crate::__function_path!()), format_args!($($arg)+))
    };
}

/// Log a panic-level message, then unwind with the entry as payload.
///
/// Named apart from `std::panic!` so both can be in scope.
#[macro_export]
macro_rules! panic_log {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::Panic, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{Level, Logger};
    use crate::sinks::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn capture() -> (Logger, MemorySink) {
        let sink = MemorySink::new();
        let logger = Logger::builder()
            .level(Level::Debug)
            .output(sink.clone())
            .build();
        (logger, sink)
    }

    #[test]
    fn test_log_macro() {
        let (logger, sink) = capture();
        log!(logger, Level::Info, "Test message");
        log!(logger, Level::Error, "Formatted: {}", 42);

        let out = sink.contents_string();
        assert!(out.contains("[INFO] _msg= Test message"));
        assert!(out.contains("[ERROR] _msg= Formatted: 42"));
    }

    #[test]
    fn test_level_macros() {
        let (logger, sink) = capture();
        debug!(logger, "Count: {}", 5);
        info!(logger, "Items: {}", 100);
        warn!(logger, "Retry {} of {}", 1, 3);
        error!(logger, "Code: {}", 500);

        let out = sink.contents_string();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("[DEBUG] _msg= Count: 5"));
        assert!(lines[1].contains("[INFO] _msg= Items: 100"));
        assert!(lines[2].contains("[WARNING] _msg= Retry 1 of 3"));
        assert!(lines[3].contains("[ERROR] _msg= Code: 500"));
    }

    #[test]
    fn test_macros_on_entry_chain() {
        let (logger, sink) = capture();
        info!(logger.with_field("user", "ann"), "signed in");
        assert!(sink.contents_string().contains("user= ann _msg= signed in"));
    }

    #[test]
    fn test_fatal_macro_exits() {
        let (logger, sink) = capture();
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&exits);
        logger.set_exit_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        fatal!(logger, "Critical failure: {}", "system");
        assert_eq!(exits.load(Ordering::SeqCst), 1);
        assert!(sink.contents_string().contains("[FATAL] _msg= Critical failure: system"));
    }

    #[test]
    fn test_panic_log_macro_unwinds() {
        let (logger, sink) = capture();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            panic_log!(logger, "invariant {} broken", "x");
        }));
        let entry = result.unwrap_err().downcast::<crate::Entry>().unwrap();
        assert_eq!(entry.message(), "invariant x broken");
        assert!(sink.contents_string().contains("[PANIC] _msg= invariant x broken"));
    }
}
