//! Thread-safe log writer with size-based rotation

use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::fallback::{ConsoleFallback, Fallback};
use crate::record::{Level, Record};
use crate::rotation::{rotate_files, RotationPolicy};

/// State of the active file handle
enum Handle {
    Open(BufWriter<File>),
    /// Reopening after a rotation failed; retried on the next write
    Lost,
    /// Initialization failed; records go to the fallback for good
    Degraded,
    Closed,
}

struct Inner {
    handle: Handle,
    rotations: u64,
}

/// Log writer that appends rendered records to a single active file and
/// rotates it into numbered backups once it reaches the size threshold.
///
/// One instance per active file. All operations take `&self` and are
/// serialized by an internal mutex, so the writer is shared between
/// producers through an `Arc`. No operation returns an error: failures
/// are sent to the [`Fallback`] and the caller carries on.
pub struct RotatingWriter {
    policy: RotationPolicy,
    active_path: PathBuf,
    fallback: Arc<dyn Fallback>,
    inner: Mutex<Inner>,
}

impl RotatingWriter {
    /// Open the active file, reporting failures on the console
    pub fn initialize(policy: RotationPolicy) -> Self {
        Self::with_fallback(policy, Arc::new(ConsoleFallback))
    }

    /// Open the active file, sending degraded output and failure reports
    /// to `fallback`
    pub fn with_fallback(policy: RotationPolicy, fallback: Arc<dyn Fallback>) -> Self {
        let active_path = policy.active_path();

        let handle = match open_for_append(&policy) {
            Ok(file) => Handle::Open(BufWriter::new(file)),
            Err(e) => {
                warn!(
                    "Log file {} unavailable, falling back to console: {}",
                    active_path.display(),
                    e
                );
                fallback.report(&format!("Error initializing logger: {}", e));
                Handle::Degraded
            }
        };

        Self {
            policy,
            active_path,
            fallback,
            inner: Mutex::new(Inner {
                handle,
                rotations: 0,
            }),
        }
    }

    /// Log a message
    pub fn write(&self, level: Level, message: impl Into<String>, source: impl Into<String>) {
        self.write_record(&Record::new(level, message, source));
    }

    pub fn debug(&self, message: impl Into<String>, source: impl Into<String>) {
        self.write(Level::Debug, message, source);
    }

    pub fn info(&self, message: impl Into<String>, source: impl Into<String>) {
        self.write(Level::Info, message, source);
    }

    pub fn warn(&self, message: impl Into<String>, source: impl Into<String>) {
        self.write(Level::Warning, message, source);
    }

    pub fn error(&self, message: impl Into<String>, source: impl Into<String>) {
        self.write(Level::Error, message, source);
    }

    /// Append a record, rotating first if the active file is full.
    ///
    /// The size check, any rotation, and the append happen under one lock,
    /// so lines from concurrent callers never interleave and no record is
    /// written into a file that is being rotated away.
    pub fn write_record(&self, record: &Record) {
        let line = record.render();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        match inner.handle {
            Handle::Degraded | Handle::Closed => {
                self.fallback.emit(&line);
                return;
            }
            Handle::Lost => match open_for_append(&self.policy) {
                Ok(file) => inner.handle = Handle::Open(BufWriter::new(file)),
                Err(e) => {
                    self.fallback
                        .report(&format!("Error reopening log file: {}", e));
                    self.fallback.emit(&line);
                    return;
                }
            },
            Handle::Open(_) => {}
        }

        if self.needs_rotation() {
            self.rotate(inner);
        }

        let failed = match &mut inner.handle {
            Handle::Open(writer) => append_line(writer, &line).err(),
            _ => {
                self.fallback.emit(&line);
                None
            }
        };

        if let Some(e) = failed {
            self.fallback
                .report(&format!("Error writing to log: {}", e));
            discard_buffered(inner);
        }
    }

    /// Flush and release the active file. Later writes go to the fallback.
    /// Calling this more than once is harmless.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Handle::Open(mut writer) = mem::replace(&mut inner.handle, Handle::Closed) {
            if let Err(e) = writer.flush() {
                self.fallback
                    .report(&format!("Error closing logger: {}", e));
            }
            debug!("Closed log file {}", self.active_path.display());
        }
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Get the active log file path
    pub fn active_path(&self) -> &Path {
        &self.active_path
    }

    /// Whether initialization failed and records go to the fallback
    pub fn is_degraded(&self) -> bool {
        matches!(self.inner.lock().handle, Handle::Degraded)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.inner.lock().handle, Handle::Closed)
    }

    /// Number of rotations that moved the active file out of the way
    pub fn rotations(&self) -> u64 {
        self.inner.lock().rotations
    }

    /// A size that cannot be read counts as "not full"
    fn needs_rotation(&self) -> bool {
        fs::metadata(&self.active_path)
            .map(|m| m.len() >= self.policy.max_file_size_bytes())
            .unwrap_or(false)
    }

    /// Rotate the active file. Called with the lock held.
    fn rotate(&self, inner: &mut Inner) {
        debug!("Rotating log file: {}", self.active_path.display());

        if let Handle::Open(mut writer) = mem::replace(&mut inner.handle, Handle::Lost) {
            if let Err(e) = writer.flush() {
                self.fallback
                    .report(&format!("Error flushing log before rotation: {}", e));
            }
        }

        let report = rotate_files(&self.policy, self.fallback.as_ref());
        let moved = report.promoted || report.discarded;
        if moved {
            inner.rotations += 1;
        }

        // If the active file could not be moved, keep appending to it rather
        // than truncating records that never made it into a backup.
        let reopened = if moved || !self.active_path.exists() {
            OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.active_path)
        } else {
            open_for_append(&self.policy)
        };

        match reopened {
            Ok(file) => inner.handle = Handle::Open(BufWriter::new(file)),
            Err(e) => {
                warn!(
                    "Failed to reopen {} after rotation: {}",
                    self.active_path.display(),
                    e
                );
                self.fallback
                    .report(&format!("Error reopening log file after rotation: {}", e));
            }
        }
    }
}

/// Create the log directory if needed and open the active file for appending
fn open_for_append(policy: &RotationPolicy) -> io::Result<File> {
    fs::create_dir_all(policy.directory())?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(policy.active_path())
}

/// Drop whatever a failed append left in the buffer so it is not retried
/// ahead of the next record
fn discard_buffered(inner: &mut Inner) {
    if let Handle::Open(writer) = mem::replace(&mut inner.handle, Handle::Lost) {
        let (file, _) = writer.into_parts();
        inner.handle = Handle::Open(BufWriter::new(file));
    }
}

fn append_line(writer: &mut BufWriter<File>, line: &str) -> io::Result<()> {
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()
}
