//! Caller attribution
//!
//! Public logging methods are `#[track_caller]`, so the `Location` they hand
//! down already points past the logger's own frames. What is left to filter are
//! locations that still resolve inside the logger's own source files (an
//! internal path that does not forward the caller). Only those exact files are
//! filtered; their neighbours in the crate are ordinary callers.

use super::{log_entry, logger};
use std::panic::Location;

/// Source position of the code that issued a log call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    /// Path of the enclosing function, when the call went through a macro.
    pub function: Option<String>,
    pub file: String,
    pub line: u32,
}

impl Caller {
    /// `file:line`
    pub fn file_line(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

/// Files whose locations are never reported as callers.
const INTERNAL_FILES: [&str; 3] = [file!(), logger::SOURCE_FILE, log_entry::SOURCE_FILE];

fn is_internal(file: &str) -> bool {
    INTERNAL_FILES.contains(&file)
}

/// Resolve the reported caller for a log call made at `location`.
///
/// Returns `None` when the location is inside the logger's own files.
pub(crate) fn capture(location: &'static Location<'static>, function: Option<&str>) -> Option<Caller> {
    if is_internal(location.file()) {
        return None;
    }
    Some(Caller {
        function: function.map(str::to_string),
        file: location.file().to_string(),
        line: location.line(),
    })
}

/// Path of the function enclosing the macro invocation.
#[doc(hidden)]
#[macro_export]
macro_rules! __function_path {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        let name = name.strip_suffix("::f").unwrap_or(name);
        name.trim_end_matches("::{{closure}}")
    }};
}
