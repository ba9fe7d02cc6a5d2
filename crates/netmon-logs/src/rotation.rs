//! Log rotation policy and the numbered-backup rotation algorithm
//!
//! Backups live next to the active file as `<file_name>.<N>`, with `.1`
//! the most recently rotated. The file operations are not atomic as a
//! group: a failure partway through leaves a valid but incomplete backup
//! set, and the remaining steps still run.

use netmon_core::{constants, LoggingConfig};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::fallback::Fallback;

/// Log rotation policy
///
/// Construction never fails: an empty file name or directory and a zero
/// size threshold are replaced by their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    file_name: String,
    max_file_size_bytes: u64,
    max_backup_files: usize,
    directory: PathBuf,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            file_name: constants::DEFAULT_LOG_FILE_NAME.to_string(),
            max_file_size_bytes: constants::DEFAULT_LOG_MAX_SIZE,
            max_backup_files: constants::DEFAULT_LOG_MAX_FILES,
            directory: PathBuf::from(constants::DEFAULT_LOG_DIRECTORY),
        }
    }
}

impl RotationPolicy {
    pub fn new(
        file_name: impl Into<String>,
        max_file_size_bytes: u64,
        max_backup_files: usize,
        directory: impl Into<PathBuf>,
    ) -> Self {
        let defaults = Self::default();

        let file_name = file_name.into();
        let file_name = match file_name.trim() {
            "" => defaults.file_name,
            trimmed => trimmed.to_string(),
        };

        let directory = directory.into();
        let directory = if directory.as_os_str().is_empty() {
            defaults.directory
        } else {
            directory
        };

        Self {
            file_name,
            max_file_size_bytes: if max_file_size_bytes == 0 {
                defaults.max_file_size_bytes
            } else {
                max_file_size_bytes
            },
            max_backup_files,
            directory,
        }
    }

    /// Same as [`RotationPolicy::new`] with the threshold given in megabytes
    pub fn from_megabytes(
        file_name: impl Into<String>,
        max_file_size_mb: u64,
        max_backup_files: usize,
        directory: impl Into<PathBuf>,
    ) -> Self {
        let bytes = max_file_size_mb
            .checked_mul(constants::BYTES_PER_MB)
            .unwrap_or(0);
        Self::new(file_name, bytes, max_backup_files, directory)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_bytes
    }

    pub fn max_backup_files(&self) -> usize {
        self.max_backup_files
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the file currently being appended to
    pub fn active_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Path of backup number `index`
    pub fn backup_path(&self, index: usize) -> PathBuf {
        self.directory.join(format!("{}.{}", self.file_name, index))
    }

    /// Backup index encoded in `name`, if it is one of this policy's backups
    fn backup_index(&self, name: &str) -> Option<usize> {
        let suffix = name.strip_prefix(&self.file_name)?.strip_prefix('.')?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok().filter(|n| *n >= 1)
    }
}

impl From<&LoggingConfig> for RotationPolicy {
    fn from(config: &LoggingConfig) -> Self {
        Self::new(
            config.file_name(),
            config.max_file_size_bytes(),
            config.max_backup_files(),
            config.directory(),
        )
    }
}

/// What a call to [`rotate_files`] did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RotationReport {
    /// Backup indices deleted before shifting
    pub evicted: Vec<usize>,
    /// Number of backups renamed within the chain
    pub shifted: usize,
    /// Active file renamed to backup 1
    pub promoted: bool,
    /// Active file deleted because no backups are kept
    pub discarded: bool,
    /// File operations that failed
    pub failures: usize,
}

impl RotationReport {
    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// List the backup indices present on disk, ascending
pub fn existing_backups(policy: &RotationPolicy) -> io::Result<Vec<usize>> {
    let mut indices = Vec::new();
    for entry in fs::read_dir(policy.directory())? {
        let entry = entry?;
        if let Some(index) = entry
            .file_name()
            .to_str()
            .and_then(|name| policy.backup_index(name))
        {
            indices.push(index);
        }
    }
    indices.sort_unstable();
    Ok(indices)
}

/// Move the (already closed) active file into the backup chain.
///
/// Runs eviction, the shift (which also closes gaps in the chain), and
/// promotion to `.1`. With no backups retained the active file is
/// deleted instead. Failures are
/// reported to `fallback` and the remaining steps still run. Reopening
/// the active file is left to the caller.
pub fn rotate_files(policy: &RotationPolicy, fallback: &dyn Fallback) -> RotationReport {
    let mut report = RotationReport::default();
    let active = policy.active_path();
    let max_backups = policy.max_backup_files();

    if max_backups == 0 {
        match remove_if_exists(&active) {
            Ok(removed) => report.discarded = removed,
            Err(e) => {
                report.failures += 1;
                report_failure(
                    fallback,
                    &format!("failed to discard {}: {}", active.display(), e),
                );
            }
        }
        return report;
    }

    // Eviction: anything at or above K is gone before the shift, so the
    // shift can never produce an index past K.
    let listed = match existing_backups(policy) {
        Ok(indices) => Some(indices),
        Err(e) => {
            report.failures += 1;
            report_failure(
                fallback,
                &format!(
                    "failed to list backups in {}: {}",
                    policy.directory().display(),
                    e
                ),
            );
            None
        }
    };

    let mut doomed: Vec<usize> = listed
        .iter()
        .flatten()
        .copied()
        .filter(|n| *n > max_backups)
        .collect();
    doomed.push(max_backups);

    for index in doomed {
        let path = policy.backup_path(index);
        match remove_if_exists(&path) {
            Ok(true) => report.evicted.push(index),
            Ok(false) => {}
            Err(e) => {
                report.failures += 1;
                report_failure(
                    fallback,
                    &format!("failed to delete {}: {}", path.display(), e),
                );
            }
        }
    }

    // Without a listing, only the contiguous chain from .1 can be found
    let survivors: Vec<usize> = match listed {
        Some(indices) => indices.into_iter().filter(|n| *n < max_backups).collect(),
        None => (1..max_backups)
            .take_while(|n| policy.backup_path(*n).exists())
            .collect(),
    };

    for (from, to) in shift_plan(&survivors) {
        let from_path = policy.backup_path(from);
        let to_path = policy.backup_path(to);
        match fs::rename(&from_path, &to_path) {
            Ok(()) => report.shifted += 1,
            Err(e) => {
                report.failures += 1;
                report_failure(
                    fallback,
                    &format!(
                        "failed to rename {} to {}: {}",
                        from_path.display(),
                        to_path.display(),
                        e
                    ),
                );
            }
        }
    }

    if active.exists() {
        let first = policy.backup_path(1);
        match fs::rename(&active, &first) {
            Ok(()) => report.promoted = true,
            Err(e) => {
                report.failures += 1;
                report_failure(
                    fallback,
                    &format!(
                        "failed to rename {} to {}: {}",
                        active.display(),
                        first.display(),
                        e
                    ),
                );
            }
        }
    }

    debug!(
        "Rotated {}: evicted {:?}, shifted {}, promoted {}",
        active.display(),
        report.evicted,
        report.shifted,
        report.promoted
    );

    report
}

/// Renames that turn the ascending backup indices `survivors` into the
/// chain `2..=len + 1`, leaving `.1` free for the active file.
///
/// Backups past the first gap move down first, in ascending order; the
/// contiguous prefix `1..=p` then shifts up in descending order. Index
/// `p + 1` is never occupied, so no rename lands on a file that has not
/// moved yet. Cost is one rename per backup on disk.
fn shift_plan(survivors: &[usize]) -> Vec<(usize, usize)> {
    let prefix = survivors
        .iter()
        .enumerate()
        .take_while(|(i, n)| **n == i + 1)
        .count();

    let compact = survivors[prefix..]
        .iter()
        .enumerate()
        .map(|(k, from)| (*from, prefix + k + 2))
        .filter(|(from, to)| from != to);
    let shift_up = survivors[..prefix].iter().rev().map(|from| (*from, from + 1));

    compact.chain(shift_up).collect()
}

/// Remove a file, treating "already gone" as success. Returns whether a
/// file was actually removed.
fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

fn report_failure(fallback: &dyn Fallback, detail: &str) {
    warn!("Log rotation step failed: {}", detail);
    fallback.report(&format!("Error rotating log: {}", detail));
}
