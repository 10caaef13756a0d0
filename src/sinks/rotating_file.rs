//! Size-bounded log file with background retention
//!
//! [`RotatingFileSink`] writes to a single live file. When a write would make
//! the file reach its size cap, the live file is renamed to a timestamped
//! backup next to it and a fresh file is opened in its place:
//!
//! ```text
//! /var/log/app.log
//! /var/log/app-2025-01-08 10-30-45.123.log
//! /var/log/app-2025-01-07 22-01-09.870.log.gz
//! ```
//!
//! Pruning and compressing backups happens on a worker thread that is started
//! on first use. Requests to run it while a run is already pending are dropped.

use crate::core::error::{LoggerError, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use crossbeam_channel::{Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread;

/// Timestamp embedded in backup names, local time with millisecond precision.
pub const BACKUP_TIME_FORMAT: &str = "%Y-%m-%d %H-%M-%S%.3f";
pub const COMPRESS_SUFFIX: &str = ".gz";
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

const MEGABYTE: u64 = 1024 * 1024;
const COPY_CHUNK: usize = 64 * 1024;

/// Settings for a [`RotatingFileSink`].
///
/// Deserializes from partial documents; missing keys take their defaults.
///
/// ```
/// use glog::RotatingFileConfig;
///
/// let config: RotatingFileConfig =
///     serde_json::from_str(r#"{"path": "/tmp/app.log", "max_backups": 3}"#).unwrap();
/// assert_eq!(config.max_size, 100);
/// assert_eq!(config.max_backups, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatingFileConfig {
    /// Live file. Defaults to `<temp dir>/<program name>-backup.log`.
    pub path: Option<PathBuf>,
    /// Size cap in megabytes; 0 means the default of 100.
    pub max_size: u64,
    /// Days to keep backups; 0 keeps them regardless of age.
    pub max_age: u32,
    /// Backups to keep; 0 keeps all of them.
    pub max_backups: usize,
    /// Gzip backups once they are rotated out.
    pub compress: bool,
    /// Byte-granular cap, takes precedence over `max_size`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
}

impl Default for RotatingFileConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_size: DEFAULT_MAX_SIZE_MB,
            max_age: 0,
            max_backups: 0,
            compress: false,
            max_bytes: None,
        }
    }
}

impl RotatingFileConfig {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, megabytes: u64) -> Self {
        self.max_size = megabytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = Some(bytes);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age(mut self, days: u32) -> Self {
        self.max_age = days;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compress(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    /// Effective size cap in bytes.
    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        match self.max_bytes {
            Some(bytes) if bytes > 0 => bytes,
            _ if self.max_size == 0 => DEFAULT_MAX_SIZE_MB * MEGABYTE,
            _ => self.max_size.saturating_mul(MEGABYTE),
        }
    }

    /// Effective live file path.
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => default_path(),
        }
    }
}

fn default_path() -> PathBuf {
    let program = std::env::args_os()
        .next()
        .and_then(|arg| Path::new(&arg).file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "glog".to_string());
    std::env::temp_dir().join(format!("{}-backup.log", program))
}

/// Splits `app.log` into (`app-`, `.log`).
fn prefix_and_ext(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) => (format!("{}-", &name[..idx]), name[idx..].to_string()),
        None => (format!("{}-", name), String::new()),
    }
}

#[derive(Debug)]
struct BackupFile {
    name: String,
    timestamp: NaiveDateTime,
}

impl BackupFile {
    fn is_compressed(&self) -> bool {
        self.name.ends_with(COMPRESS_SUFFIX)
    }

    /// Name with any compression suffix removed.
    fn base_name(&self) -> &str {
        self.name.strip_suffix(COMPRESS_SUFFIX).unwrap_or(&self.name)
    }
}

/// What the retention pass needs to know about a sink. Shared with the
/// worker thread so the worker does not keep the sink itself alive.
#[derive(Debug)]
struct Retention {
    dir: PathBuf,
    prefix: String,
    ext: String,
    max_age: u32,
    max_backups: usize,
    compress: bool,
    #[cfg(test)]
    worker_gate: Mutex<()>,
    #[cfg(test)]
    worker_runs: std::sync::atomic::AtomicUsize,
}

impl Retention {
    fn is_noop(&self) -> bool {
        self.max_backups == 0 && self.max_age == 0 && !self.compress
    }

    fn backup_name(&self, now: NaiveDateTime) -> String {
        format!("{}{}{}", self.prefix, now.format(BACKUP_TIME_FORMAT), self.ext)
    }

    /// First backup path at or after `at` whose name is free in both its
    /// plain and compressed form, stepping a millisecond at a time.
    fn free_backup_path(&self, mut at: NaiveDateTime) -> (PathBuf, NaiveDateTime) {
        loop {
            let name = self.backup_name(at);
            let path = self.dir.join(&name);
            let compressed = self.dir.join(format!("{}{}", name, COMPRESS_SUFFIX));
            if !path.exists() && !compressed.exists() {
                return (path, at);
            }
            at += ChronoDuration::milliseconds(1);
        }
    }

    fn parse_timestamp(&self, name: &str, ext: &str) -> Option<NaiveDateTime> {
        let stamp = name.strip_prefix(self.prefix.as_str())?.strip_suffix(ext)?;
        NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT).ok()
    }

    /// Backups in the log directory, newest first.
    fn backups(&self) -> Result<Vec<BackupFile>> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            LoggerError::io_operation(
                "reading log directory",
                format!("cannot list '{}'", self.dir.display()),
                e,
            )
        })?;

        let compressed_ext = format!("{}{}", self.ext, COMPRESS_SUFFIX);
        let mut backups = Vec::new();
        for entry in entries.flatten() {
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(true) {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let timestamp = self
                .parse_timestamp(&name, &self.ext)
                .or_else(|| self.parse_timestamp(&name, &compressed_ext));
            if let Some(timestamp) = timestamp {
                backups.push(BackupFile { name, timestamp });
            }
        }
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Prune and compress backups. Keeps going past individual failures and
    /// reports the first one.
    fn run(&self) -> Result<()> {
        if self.is_noop() {
            return Ok(());
        }

        let mut backups = self.backups()?;
        let mut remove = Vec::new();

        if self.max_backups > 0 && self.max_backups < backups.len() {
            let mut kept: HashSet<String> = HashSet::new();
            let mut remaining = Vec::with_capacity(backups.len());
            for backup in backups {
                let base = backup.base_name().to_string();
                if kept.contains(&base) || kept.len() < self.max_backups {
                    kept.insert(base);
                    remaining.push(backup);
                } else {
                    remove.push(backup);
                }
            }
            backups = remaining;
        }

        if self.max_age > 0 {
            let cutoff = Local::now().naive_local() - ChronoDuration::days(i64::from(self.max_age));
            let (old, young): (Vec<_>, Vec<_>) =
                backups.into_iter().partition(|b| b.timestamp < cutoff);
            remove.extend(old);
            backups = young;
        }

        let mut first_err = None;
        for backup in &remove {
            let path = self.dir.join(&backup.name);
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != io::ErrorKind::NotFound && first_err.is_none() {
                    first_err = Some(LoggerError::io_operation(
                        "removing old backup",
                        format!("cannot remove '{}'", path.display()),
                        e,
                    ));
                }
            }
        }

        if self.compress {
            for backup in backups.iter().filter(|b| !b.is_compressed()) {
                let src = self.dir.join(&backup.name);
                let dst = self.dir.join(format!("{}{}", backup.name, COMPRESS_SUFFIX));
                if let Err(e) = compress_file(&src, &dst) {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Gzip `src` into `dst` through a temporary file. `src` is removed only
/// after `dst` is complete; a failed attempt leaves no partial `dst` behind.
fn compress_file(src: &Path, dst: &Path) -> Result<()> {
    let fail = |message: String| LoggerError::compression(src.display().to_string(), message);

    let input = File::open(src).map_err(|e| fail(format!("cannot open: {}", e)))?;
    let permissions = input.metadata().ok().map(|m| m.permissions());
    let mut reader = BufReader::with_capacity(COPY_CHUNK, input);

    let mut tmp_name = dst.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| -> io::Result<()> {
        let output = File::create(&tmp)?;
        if let Some(permissions) = &permissions {
            output.set_permissions(permissions.clone())?;
        }
        let mut encoder = flate2::write::GzEncoder::new(
            BufWriter::with_capacity(COPY_CHUNK, output),
            flate2::Compression::default(),
        );
        let mut chunk = vec![0u8; COPY_CHUNK];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            encoder.write_all(&chunk[..n])?;
        }
        let mut writer = encoder.finish()?;
        writer.flush()?;
        fs::rename(&tmp, dst)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(fail(format!("cannot write '{}': {}", dst.display(), e)));
    }

    fs::remove_file(src).map_err(|e| {
        LoggerError::io_operation(
            "removing compressed backup source",
            format!("cannot remove '{}'", src.display()),
            e,
        )
    })
}

#[derive(Debug, Default)]
struct LiveFile {
    file: Option<File>,
    size: u64,
    /// Stamp of the most recent backup this sink created.
    last_backup: Option<NaiveDateTime>,
}

/// `write_all` that reports how much was written before a failure.
fn write_counted<W: Write>(writer: &mut W, buf: &[u8]) -> (usize, io::Result<()>) {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => {
                return (
                    written,
                    Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer")),
                )
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return (written, Err(e)),
        }
    }
    (written, Ok(()))
}

#[derive(Debug)]
struct SinkInner {
    path: PathBuf,
    max_bytes: u64,
    config: RotatingFileConfig,
    retention: Arc<Retention>,
    live: Mutex<LiveFile>,
    trigger: OnceLock<Option<Sender<()>>>,
}

/// Log file that rotates itself before it reaches its size cap.
///
/// Clones share the same file, lock and retention worker. The sink is meant to
/// be handed to a logger as its output:
///
/// ```no_run
/// use glog::{Logger, RotatingFileConfig, RotatingFileSink};
///
/// let sink = RotatingFileSink::new(
///     RotatingFileConfig::new("/var/log/app.log")
///         .with_max_size(10)
///         .with_max_backups(5)
///         .with_compress(true),
/// );
/// let logger = Logger::builder().output(sink).build();
/// logger.info("ready");
/// ```
#[derive(Debug, Clone)]
pub struct RotatingFileSink {
    inner: Arc<SinkInner>,
}

impl RotatingFileSink {
    /// Nothing touches the filesystem until the first write.
    pub fn new(config: RotatingFileConfig) -> Self {
        let path = config.resolved_path();
        let (prefix, ext) = prefix_and_ext(&path);
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let retention = Arc::new(Retention {
            dir,
            prefix,
            ext,
            max_age: config.max_age,
            max_backups: config.max_backups,
            compress: config.compress,
            #[cfg(test)]
            worker_gate: Mutex::new(()),
            #[cfg(test)]
            worker_runs: std::sync::atomic::AtomicUsize::new(0),
        });
        Self {
            inner: Arc::new(SinkInner {
                max_bytes: config.max_bytes(),
                path,
                config,
                retention,
                live: Mutex::new(LiveFile::default()),
                trigger: OnceLock::new(),
            }),
        }
    }

    /// Sink with default settings writing to `path`.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        Self::new(RotatingFileConfig::new(path))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    #[must_use]
    pub fn config(&self) -> &RotatingFileConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn max_bytes(&self) -> u64 {
        self.inner.max_bytes
    }

    /// Bytes in the live file as tracked by the sink; 0 before the first write.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.inner.live.lock().size
    }

    /// Write `buf` to the live file, rotating first if it would reach the cap.
    ///
    /// A write larger than the cap is rejected without touching the file.
    /// A write that fills an empty file exactly is accepted into that file.
    pub fn write(&self, buf: &[u8]) -> Result<usize> {
        let len = buf.len() as u64;
        let max = self.inner.max_bytes;
        if len > max {
            return Err(LoggerError::write_too_large(len, max));
        }

        let mut live = self.inner.live.lock();
        if live.file.is_none() {
            self.open_existing_or_new(&mut live, len)?;
        }
        if live.size > 0 && live.size + len >= max {
            self.rotate_locked(&mut live)?;
        }

        let LiveFile { file, size, .. } = &mut *live;
        let file = file
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.inner.path.display().to_string(), "file is not open"))?;
        let (written, result) = write_counted(file, buf);
        *size += written as u64;
        result.map_err(|e| {
            LoggerError::io_operation(
                "writing log file",
                format!("cannot write to '{}'", self.inner.path.display()),
                e,
            )
        })?;
        Ok(buf.len())
    }

    /// Close the live file, move it to a backup and start a fresh one.
    pub fn rotate(&self) -> Result<()> {
        let mut live = self.inner.live.lock();
        self.rotate_locked(&mut live)
    }

    /// Close the live file. The next write reopens it. Calling this on a
    /// closed sink does nothing.
    pub fn close(&self) -> Result<()> {
        let mut live = self.inner.live.lock();
        Self::close_locked(&mut live, &self.inner.path)
    }

    /// Run one retention pass on the calling thread.
    pub fn run_retention(&self) -> Result<()> {
        self.inner.retention.run()
    }

    fn close_locked(live: &mut LiveFile, path: &Path) -> Result<()> {
        if let Some(mut file) = live.file.take() {
            file.flush().map_err(|e| {
                LoggerError::io_operation(
                    "closing log file",
                    format!("cannot flush '{}'", path.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    fn rotate_locked(&self, live: &mut LiveFile) -> Result<()> {
        Self::close_locked(live, &self.inner.path)?;
        self.open_new(live)?;
        self.request_retention();
        Ok(())
    }

    fn open_existing_or_new(&self, live: &mut LiveFile, write_len: u64) -> Result<()> {
        self.request_retention();

        let path = &self.inner.path;
        let existing = match fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return self.open_new(live),
            Err(e) => {
                return Err(LoggerError::io_operation(
                    "reading log file info",
                    format!("cannot stat '{}'", path.display()),
                    e,
                ))
            }
        };

        if existing > 0 && existing + write_len >= self.inner.max_bytes {
            return self.rotate_locked(live);
        }

        match OpenOptions::new().append(true).open(path) {
            Ok(file) => {
                live.file = Some(file);
                live.size = existing;
                Ok(())
            }
            Err(_) => self.open_new(live),
        }
    }

    /// Open a fresh live file, moving any existing one out of the way.
    fn open_new(&self, live: &mut LiveFile) -> Result<()> {
        let path = &self.inner.path;
        fs::create_dir_all(&self.inner.retention.dir).map_err(|e| {
            LoggerError::io_operation(
                "creating log directory",
                format!("cannot create '{}'", self.inner.retention.dir.display()),
                e,
            )
        })?;

        let mut permissions = None;
        if let Ok(meta) = fs::metadata(path) {
            permissions = Some(meta.permissions());
            let now = Local::now().naive_local();
            let earliest = match live.last_backup {
                Some(last) if last >= now => last + ChronoDuration::milliseconds(1),
                _ => now,
            };
            let (backup, stamp) = self.inner.retention.free_backup_path(earliest);
            fs::rename(path, &backup).map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("cannot rename to '{}': {}", backup.display(), e),
                )
            })?;
            live.last_backup = Some(stamp);
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                LoggerError::file_sink(path.display().to_string(), format!("cannot open: {}", e))
            })?;
        if let Some(permissions) = permissions {
            if let Err(e) = file.set_permissions(permissions) {
                eprintln!(
                    "[LOGGER WARNING] cannot restore permissions on '{}': {}",
                    path.display(),
                    e
                );
            }
        }

        live.file = Some(file);
        live.size = 0;
        Ok(())
    }

    /// Ask the worker for a retention pass. Dropped if one is already pending.
    fn request_retention(&self) {
        if self.inner.retention.is_noop() {
            return;
        }
        let trigger = self.inner.trigger.get_or_init(|| {
            let (tx, rx) = crossbeam_channel::bounded::<()>(1);
            let retention = Arc::clone(&self.inner.retention);
            let spawned = thread::Builder::new()
                .name("glog-retention".to_string())
                .spawn(move || {
                    for () in rx.iter() {
                        #[cfg(test)]
                        let _gate = retention.worker_gate.lock();
                        if let Err(e) = retention.run() {
                            eprintln!("[LOGGER ERROR] retention pass failed: {}", e);
                        }
                        #[cfg(test)]
                        retention
                            .worker_runs
                            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    }
                });
            match spawned {
                Ok(_) => Some(tx),
                Err(e) => {
                    eprintln!("[LOGGER ERROR] cannot start retention worker: {}", e);
                    None
                }
            }
        });
        if let Some(tx) = trigger {
            match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    eprintln!("[LOGGER ERROR] retention worker has stopped");
                }
            }
        }
    }
}

impl Write for RotatingFileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        RotatingFileSink::write(&*self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut live = self.inner.live.lock();
        match live.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for SinkInner {
    fn drop(&mut self) {
        if let Some(mut file) = self.live.get_mut().file.take() {
            let _ = file.flush();
        }
    }
}
