//! Rendering of entries into bytes
//!
//! [`TextFormatter`] is the default. It writes one line per entry:
//!
//! ```text
//! 2025-01-08 10:30:45 [INFO] func= app::handler file= src/handler.rs:42 user= ann _msg= request served
//! ```

use super::{caller::Caller, error::Result, log_entry::Entry};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const FIELD_KEY_MSG: &str = "_msg";
pub const FIELD_KEY_LEVEL: &str = "_level";
pub const FIELD_KEY_TIME: &str = "_time";
pub const FIELD_KEY_FUNC: &str = "func";
pub const FIELD_KEY_FILE: &str = "file";

/// Renders an entry into `buf`.
///
/// The buffer is handed in cleared and belongs to the formatter for the
/// duration of the call; whatever it holds on `Ok` is what gets written.
pub trait Formatter: Send + Sync {
    fn format(&self, entry: &Entry, buf: &mut Vec<u8>) -> Result<()>;
}

impl<F> Formatter for F
where
    F: Fn(&Entry, &mut Vec<u8>) -> Result<()> + Send + Sync,
{
    fn format(&self, entry: &Entry, buf: &mut Vec<u8>) -> Result<()> {
        self(entry, buf)
    }
}

/// Customizes how a caller is rendered: returns `(function, file)`.
pub type CallerFrameFn = Arc<dyn Fn(&Caller) -> (String, String) + Send + Sync>;

#[derive(Clone, Default)]
pub struct TextFormatter {
    /// Never color the level tag, even when writing to stderr.
    pub disable_color: bool,
    pub caller_frame: Option<CallerFrameFn>,
}

impl TextFormatter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_disable_color(mut self, disable: bool) -> Self {
        self.disable_color = disable;
        self
    }

    #[must_use]
    pub fn with_caller_frame<F>(mut self, f: F) -> Self
    where
        F: Fn(&Caller) -> (String, String) + Send + Sync + 'static,
    {
        self.caller_frame = Some(Arc::new(f));
        self
    }

    #[cfg(feature = "console")]
    fn is_colored(&self, entry: &Entry) -> bool {
        entry.writes_to_stderr() && !self.disable_color
    }

    // Escape codes are written by hand; `colored` drops them when stdout is not a tty.
    fn level_text(&self, entry: &Entry) -> String {
        let text = format!(" [{}]", entry.level().to_str().to_uppercase());
        #[cfg(feature = "console")]
        if self.is_colored(entry) {
            return format!("\x1b[{}m{}\x1b[0m", entry.level().color_code().to_fg_str(), text);
        }
        text
    }

    fn append_key_value(buf: &mut String, key: &str, value: &dyn fmt::Display) {
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(key);
        buf.push_str("= ");
        let _ = write!(buf, "{}", value);
    }
}

impl fmt::Debug for TextFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextFormatter")
            .field("disable_color", &self.disable_color)
            .field("caller_frame", &self.caller_frame.is_some())
            .finish()
    }
}

impl Formatter for TextFormatter {
    fn format(&self, entry: &Entry, buf: &mut Vec<u8>) -> Result<()> {
        let (func_val, file_val) = match entry.caller() {
            Some(caller) => match &self.caller_frame {
                Some(frame) => frame(caller),
                None => (caller.function.clone().unwrap_or_default(), caller.file_line()),
            },
            None => (String::new(), String::new()),
        };

        let mut line = String::with_capacity(128);
        if let Some(time) = entry.time() {
            let _ = write!(line, "{}", time.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        line.push_str(&self.level_text(entry));

        if !func_val.is_empty() {
            Self::append_key_value(&mut line, FIELD_KEY_FUNC, &func_val);
        }
        if !file_val.is_empty() {
            Self::append_key_value(&mut line, FIELD_KEY_FILE, &file_val);
        }
        for field in entry.fields() {
            Self::append_key_value(&mut line, &field.key, &field.value);
        }
        Self::append_key_value(&mut line, FIELD_KEY_MSG, &entry.message());
        line.push('\n');

        buf.extend_from_slice(line.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Level, Logger};
    use chrono::{Local, TimeZone};

    fn fixed_entry() -> Entry {
        let logger = Logger::builder().level(Level::Debug).build();
        let time = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
        logger
            .with_time(time)
            .with_field("user", "a")
            .with_field("n", 3)
            .with_field("user", "b")
            .prepared(Level::Info, "hello")
    }

    fn render(formatter: &TextFormatter, entry: &Entry) -> String {
        let mut buf = Vec::new();
        formatter.format(entry, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_layout() {
        let out = render(&TextFormatter::new(), &fixed_entry());
        assert_eq!(
            out,
            "2025-01-08 10:30:45 [INFO] user= a n= 3 user= b _msg= hello\n"
        );
    }

    #[test]
    fn test_same_entry_formats_identically() {
        let entry = fixed_entry();
        let formatter = TextFormatter::new();
        assert_eq!(render(&formatter, &entry), render(&formatter, &entry));
    }

    #[test]
    fn test_caller_precedes_fields() {
        let entry = fixed_entry().with_caller(Caller {
            function: Some("app::handler".into()),
            file: "src/handler.rs".into(),
            line: 42,
        });
        let out = render(&TextFormatter::new(), &entry);
        assert!(out.contains("[INFO] func= app::handler file= src/handler.rs:42 user= a"));
    }

    #[test]
    fn test_caller_frame_hook() {
        let entry = fixed_entry().with_caller(Caller {
            function: None,
            file: "/long/path/src/handler.rs".into(),
            line: 7,
        });
        let formatter = TextFormatter::new()
            .with_caller_frame(|c| ("short".to_string(), format!("handler.rs:{}", c.line)));
        let out = render(&formatter, &entry);
        assert!(out.contains("func= short file= handler.rs:7"));
    }

    #[test]
    fn test_not_colored_when_not_stderr() {
        let out = render(&TextFormatter::new(), &fixed_entry());
        assert!(!out.contains("\x1b["));
    }

    #[test]
    fn test_disable_color_on_stderr() {
        let entry = fixed_entry().with_stderr_destination(true);
        let out = render(&TextFormatter::new().with_disable_color(true), &entry);
        assert!(!out.contains("\x1b["));
        assert!(out.contains(" [INFO] "));
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colored_level_tag_on_stderr() {
        let logger = Logger::builder().build();
        let time = Local.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
        let entry = logger
            .with_time(time)
            .prepared(Level::Error, "boom")
            .with_stderr_destination(true);
        let out = render(&TextFormatter::new(), &entry);
        assert_eq!(out, "2025-01-08 10:30:45\x1b[31m [ERROR]\x1b[0m _msg= boom\n");
    }

    #[test]
    fn test_reported_caller_outside_logging_internals() {
        let sink = crate::sinks::MemorySink::new();
        let logger = Logger::builder()
            .report_caller(true)
            .output(sink.clone())
            .build();
        let line = line!() + 1;
        logger.info("from formatter");
        let expected = format!("file= {}:{} _msg= from formatter", file!(), line);
        assert!(sink.contents_string().contains(&expected), "{}", sink.contents_string());
    }

    #[test]
    fn test_closure_formatter() {
        let formatter = |entry: &Entry, buf: &mut Vec<u8>| -> Result<()> {
            buf.extend_from_slice(entry.message().as_bytes());
            Ok(())
        };
        let mut buf = Vec::new();
        formatter.format(&fixed_entry(), &mut buf).unwrap();
        assert_eq!(buf, b"hello");
    }
}
