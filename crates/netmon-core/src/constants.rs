//! Constants and default values for netmon

use std::path::PathBuf;

/// Default active log file name
pub const DEFAULT_LOG_FILE_NAME: &str = "network_monitor.log";

/// Default log directory, relative to the working directory
pub const DEFAULT_LOG_DIRECTORY: &str = "logs";

/// Default log max size in megabytes
pub const DEFAULT_LOG_MAX_SIZE_MB: u64 = 10;

/// Default log max size in bytes (10MB)
pub const DEFAULT_LOG_MAX_SIZE: u64 = DEFAULT_LOG_MAX_SIZE_MB * BYTES_PER_MB;

/// Default number of rotated backups to keep
pub const DEFAULT_LOG_MAX_FILES: usize = 5;

/// Bytes in one megabyte, as used by the size options
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default delay before the first collection cycle, in seconds
pub const DEFAULT_INITIAL_DELAY_SECS: u64 = 5;

/// Default collection interval in seconds
pub const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 60;

/// Memory usage (percent of total) above which a warning is logged
pub const DEFAULT_MEMORY_WARNING_PERCENT: u8 = 90;

/// How long shutdown waits for an in-flight collection cycle, in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 5;

/// Name of the per-user config directory
pub const NETMON_DIR: &str = "netmon";

/// Config file names to search for (in priority order)
pub const CONFIG_FILES: &[&str] = &["netmon.toml", "netmon.yaml", "netmon.yml", "netmon.json"];

/// Get the per-user config directory (e.g. ~/.config/netmon)
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(NETMON_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_size_in_bytes() {
        assert_eq!(DEFAULT_LOG_MAX_SIZE, 10 * 1024 * 1024);
    }

    #[test]
    fn test_user_config_dir() {
        if let Some(dir) = user_config_dir() {
            assert!(dir.ends_with(NETMON_DIR));
        }
    }
}
