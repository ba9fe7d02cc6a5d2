//! Fallback output used when the log file is unavailable

use parking_lot::Mutex;
use std::io::Write;

/// Destination for records that cannot reach the log file, and for
/// reports about the writer's own failures.
///
/// Implementations must not panic or block for long: they run inside the
/// writer's critical section.
pub trait Fallback: Send + Sync {
    /// Emit a rendered record (degraded or closed writer)
    fn emit(&self, line: &str);

    /// Surface a failure of the writer itself
    fn report(&self, message: &str);
}

/// Writes records to stdout and failure reports to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleFallback;

impl Fallback for ConsoleFallback {
    fn emit(&self, line: &str) {
        let _ = writeln!(std::io::stdout().lock(), "{}", line);
    }

    fn report(&self, message: &str) {
        let _ = writeln!(std::io::stderr().lock(), "{}", message);
    }
}

/// Keeps everything in memory so it can be inspected later
#[derive(Debug, Default)]
pub struct MemoryFallback {
    lines: Mutex<Vec<String>>,
    reports: Mutex<Vec<String>>,
}

impl MemoryFallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records emitted so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Failure reports so far
    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().clone()
    }

    /// Check if any report contains `needle`
    pub fn was_reported(&self, needle: &str) -> bool {
        self.reports.lock().iter().any(|r| r.contains(needle))
    }
}

impl Fallback for MemoryFallback {
    fn emit(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }

    fn report(&self, message: &str) {
        self.reports.lock().push(message.to_string());
    }
}
