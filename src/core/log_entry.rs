//! Log entry structure
//!
//! An [`Entry`] is a record under construction. The `with_*` methods never
//! modify the receiver; each returns a new entry holding its own copy of the
//! field list, so two chains started from the same entry cannot observe each
//! other. The leveled methods (`info`, `warn`, ...) are terminal: they stamp
//! the entry, render it and hand the bytes to the logger's output.

use super::{
    caller::{self, Caller},
    error::{LoggerError, Result},
    field::{Field, FieldValue, ERROR_KEY},
    log_level::Level,
    logger::Logger,
    pool::{default_buffer_pool, Reset},
};
use chrono::{DateTime, Local};
use std::any::Any;
use std::fmt::{self, Write as _};
use std::panic::Location;
use std::sync::Arc;

/// Locations in this file are never reported as callers.
pub(crate) const SOURCE_FILE: &str = file!();

/// Opaque per-entry context, available to custom formatters.
pub type Context = Arc<dyn Any + Send + Sync>;

#[derive(Clone)]
pub struct Entry {
    logger: Option<Logger>,
    fields: Vec<Field>,
    time: Option<DateTime<Local>>,
    level: Level,
    caller: Option<Caller>,
    message: String,
    context: Option<Context>,
    field_error: Option<String>,
    to_stderr: bool,
}

impl Entry {
    pub fn new(logger: &Logger) -> Self {
        let mut entry = Self::detached();
        entry.logger = Some(logger.clone());
        entry
    }

    /// An entry without a logger; it renders but never emits.
    pub(crate) fn detached() -> Self {
        Self {
            logger: None,
            fields: Vec::new(),
            time: None,
            level: Level::Info,
            caller: None,
            message: String::new(),
            context: None,
            field_error: None,
            to_stderr: false,
        }
    }

    pub(crate) fn attach(&mut self, logger: &Logger) {
        self.logger = Some(logger.clone());
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn time(&self) -> Option<DateTime<Local>> {
        self.time
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Accumulated complaints about rejected fields, e.g.
    /// `cannot add field "callback"`. Never rendered by the text formatter.
    pub fn field_error(&self) -> Option<&str> {
        self.field_error.as_deref()
    }

    /// Whether the output this entry is being rendered for is stderr.
    pub fn writes_to_stderr(&self) -> bool {
        self.to_stderr
    }

    /// Copy of the chain-carried state: logger, fields, time, context and
    /// the field diagnostic. Level, message and caller start fresh.
    fn derive(&self) -> Self {
        Self {
            logger: self.logger.clone(),
            fields: self.fields.clone(),
            time: self.time,
            context: self.context.clone(),
            field_error: self.field_error.clone(),
            ..Self::detached()
        }
    }

    pub fn with_field<K, V>(&self, key: K, value: V) -> Entry
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.with_fields([Field::new(key, value)])
    }

    /// Append fields in order. Function values are not stored; each one adds
    /// a note to [`field_error`](Self::field_error) instead.
    pub fn with_fields<I>(&self, fields: I) -> Entry
    where
        I: IntoIterator<Item = Field>,
    {
        let mut entry = self.derive();
        for field in fields {
            if field.value.is_callable() {
                let note = format!("cannot add field {:?}", field.key);
                entry.field_error = Some(match entry.field_error.take() {
                    Some(prev) => format!("{}, {}", prev, note),
                    None => note,
                });
            } else {
                entry.fields.push(field);
            }
        }
        entry
    }

    pub fn with_error(&self, err: &dyn std::error::Error) -> Entry {
        self.with_field(ERROR_KEY, err.to_string())
    }

    pub fn with_time(&self, time: DateTime<Local>) -> Entry {
        let mut entry = self.derive();
        entry.time = Some(time);
        entry
    }

    pub fn with_context(&self, context: Context) -> Entry {
        let mut entry = self.derive();
        entry.context = Some(context);
        entry
    }

    /// Attribute the entry to an explicit source position. When the logger
    /// reports callers, emission replaces it with the captured one.
    pub fn with_caller(&self, caller: Caller) -> Entry {
        let mut entry = self.derive();
        entry.caller = Some(caller);
        entry
    }

    /// Render with the owning logger's current formatter.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        let logger = self
            .logger
            .as_ref()
            .ok_or_else(|| LoggerError::other("entry is not attached to a logger"))?;
        let mut buf = Vec::new();
        logger.formatter().format(self, &mut buf)?;
        Ok(buf)
    }

    pub fn string(&self) -> Result<String> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes).map_err(|e| LoggerError::formatter("utf8", e.to_string()))
    }

    fn is_enabled(&self, level: Level) -> bool {
        self.logger
            .as_ref()
            .is_some_and(|logger| logger.is_level_enabled(level))
    }

    /// Shared terminal path for every leveled method and macro.
    pub(crate) fn emit(
        &mut self,
        level: Level,
        msg: impl fmt::Display,
        location: &'static Location<'static>,
        function: Option<&str>,
    ) {
        if !self.is_enabled(level) {
            return;
        }
        let Some(logger) = self.logger.clone() else {
            return;
        };

        self.message.clear();
        let _ = write!(self.message, "{}", msg);
        if self.time.is_none() {
            self.time = Some(Local::now());
        }
        self.level = level;

        if logger.report_caller() {
            self.caller = caller::capture(location, function);
        }

        {
            let pool = logger.buffer_pool().unwrap_or_else(|| default_buffer_pool());
            let mut buffer = pool.get();
            logger.write_entry(self, &mut buffer);
        }

        if level == Level::Panic {
            std::panic::panic_any(self.clone());
        }
    }

    #[track_caller]
    pub fn log(&mut self, level: Level, msg: impl fmt::Display) {
        self.emit(level, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn logf(&mut self, level: Level, args: fmt::Arguments<'_>) {
        self.emit(level, args, Location::caller(), None);
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn log_in(&mut self, level: Level, function: Option<&str>, msg: impl fmt::Display) {
        self.emit(level, msg, Location::caller(), function);
    }

    #[doc(hidden)]
    #[track_caller]
    pub fn fatal_in(&mut self, function: Option<&str>, msg: impl fmt::Display) {
        self.emit(Level::Fatal, msg, Location::caller(), function);
        self.exit();
    }

    fn exit(&self) {
        if let Some(logger) = &self.logger {
            logger.exit();
        }
    }

    #[track_caller]
    pub fn debug(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Debug, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn info(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Info, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn warn(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Warn, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn warning(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Warn, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn error(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Error, msg, Location::caller(), None);
    }

    /// Logs at fatal level, then calls the logger's exit hook.
    #[track_caller]
    pub fn fatal(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Fatal, msg, Location::caller(), None);
        self.exit();
    }

    /// Logs at panic level, then unwinds with a clone of this entry as the
    /// panic payload.
    #[track_caller]
    pub fn panic(&mut self, msg: impl fmt::Display) {
        self.emit(Level::Panic, msg, Location::caller(), None);
    }

    #[track_caller]
    pub fn debugf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args, Location::caller(), None);
    }

    #[track_caller]
    pub fn infof(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args, Location::caller(), None);
    }

    #[track_caller]
    pub fn warnf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args, Location::caller(), None);
    }

    #[track_caller]
    pub fn warningf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args, Location::caller(), None);
    }

    #[track_caller]
    pub fn errorf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args, Location::caller(), None);
    }

    #[track_caller]
    pub fn fatalf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Fatal, args, Location::caller(), None);
        self.exit();
    }

    #[track_caller]
    pub fn panicf(&mut self, args: fmt::Arguments<'_>) {
        self.emit(Level::Panic, args, Location::caller(), None);
    }

    pub(crate) fn set_stderr_destination(&mut self, to_stderr: bool) {
        self.to_stderr = to_stderr;
    }

    #[cfg(test)]
    pub(crate) fn prepared(mut self, level: Level, msg: &str) -> Self {
        self.level = level;
        self.message = msg.to_string();
        self
    }

    #[cfg(test)]
    pub(crate) fn with_stderr_destination(mut self, to_stderr: bool) -> Self {
        self.to_stderr = to_stderr;
        self
    }
}

impl Reset for Entry {
    fn reset(&mut self) {
        self.logger = None;
        self.fields.clear();
        self.time = None;
        self.level = Level::Info;
        self.caller = None;
        self.message.clear();
        self.context = None;
        self.field_error = None;
        self.to_stderr = false;
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("time", &self.time)
            .field("level", &self.level)
            .field("message", &self.message)
            .field("fields", &self.fields)
            .field("caller", &self.caller)
            .field("field_error", &self.field_error)
            .finish_non_exhaustive()
    }
}
