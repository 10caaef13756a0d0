//! Destinations a logger can write to

use parking_lot::Mutex;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use super::rotating_file::RotatingFileSink;

/// Where formatted entries go. Any [`Write`] implementation can be plugged in
/// with [`Output::writer`].
pub enum Output {
    /// The process's standard error. The text formatter only colors here.
    Stderr,
    Stdout,
    Writer(Box<dyn Write + Send>),
}

impl Output {
    pub fn writer<W: Write + Send + 'static>(writer: W) -> Self {
        Output::Writer(Box::new(writer))
    }

    pub fn is_stderr(&self) -> bool {
        matches!(self, Output::Stderr)
    }
}

impl Default for Output {
    fn default() -> Self {
        Output::Stderr
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stderr => f.write_str("Stderr"),
            Output::Stdout => f.write_str("Stdout"),
            Output::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stderr => io::stderr().write(buf),
            Output::Stdout => io::stdout().write(buf),
            Output::Writer(w) => w.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Output::Stderr => io::stderr().lock().write_all(buf),
            Output::Stdout => io::stdout().lock().write_all(buf),
            Output::Writer(w) => w.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stderr => io::stderr().flush(),
            Output::Stdout => io::stdout().flush(),
            Output::Writer(w) => w.flush(),
        }
    }
}

impl From<RotatingFileSink> for Output {
    fn from(sink: RotatingFileSink) -> Self {
        Output::writer(sink)
    }
}

impl From<MemorySink> for Output {
    fn from(sink: MemorySink) -> Self {
        Output::writer(sink)
    }
}

impl From<Box<dyn Write + Send>> for Output {
    fn from(writer: Box<dyn Write + Send>) -> Self {
        Output::Writer(writer)
    }
}

/// In-memory output whose clones share one buffer. Handy for capturing what
/// a logger wrote.
#[derive(Clone, Default)]
pub struct MemorySink {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.buf.lock().clear();
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySink")
            .field("len", &self.buf.lock().len())
            .finish()
    }
}
