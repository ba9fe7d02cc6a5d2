//! Configuration file parsing for netmon
//!
//! Supports multiple configuration file formats:
//! - TOML (.toml)
//! - YAML (.yaml, .yml)
//! - JSON (.json)
//!
//! Every recognized option is optional. Values that are missing, of the
//! wrong type, or out of range fall back to their defaults instead of
//! failing the load.

use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::*;
use crate::error::{Error, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yaml" | "yml" => Some(ConfigFormat::Yaml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    /// Detect format from file path
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Accepts any value; anything that does not deserialize as `T` becomes `None`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Lenient<T> {
    Valid(T),
    Invalid(serde::de::IgnoredAny),
}

fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match Option::<Lenient<T>>::deserialize(deserializer)? {
        Some(Lenient::Valid(value)) => Some(value),
        Some(Lenient::Invalid(_)) | None => None,
    })
}

/// Configuration file structure (netmon.toml/yaml/json)
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
}

/// `[logging]` section: rotation options for the log writer
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub file_name: Option<String>,
    /// Size threshold in megabytes
    #[serde(default, deserialize_with = "lenient")]
    pub max_file_size_mb: Option<i64>,
    /// Size threshold in bytes; takes precedence over `max_file_size_mb`
    #[serde(default, deserialize_with = "lenient")]
    pub max_file_size_bytes: Option<i64>,
    /// Number of backups to keep; 0 keeps none
    #[serde(default, deserialize_with = "lenient")]
    pub max_backup_files: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub directory: Option<String>,
}

impl LoggingConfig {
    pub fn file_name(&self) -> String {
        self.file_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_LOG_FILE_NAME)
            .to_string()
    }

    /// Resolved size threshold in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        if let Some(bytes) = self.max_file_size_bytes.filter(|b| *b > 0) {
            return bytes as u64;
        }
        self.max_file_size_mb
            .filter(|mb| *mb > 0)
            .and_then(|mb| (mb as u64).checked_mul(BYTES_PER_MB))
            .unwrap_or(DEFAULT_LOG_MAX_SIZE)
    }

    pub fn max_backup_files(&self) -> usize {
        self.max_backup_files
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(DEFAULT_LOG_MAX_FILES)
    }

    pub fn directory(&self) -> PathBuf {
        PathBuf::from(
            self.directory
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_LOG_DIRECTORY),
        )
    }
}

/// `[monitor]` section: scheduling of the collection loop
#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonitorConfig {
    #[serde(default, deserialize_with = "lenient")]
    pub initial_delay_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub interval_secs: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub memory_warning_percent: Option<u8>,
}

impl MonitorConfig {
    pub fn initial_delay_secs(&self) -> u64 {
        self.initial_delay_secs.unwrap_or(DEFAULT_INITIAL_DELAY_SECS)
    }

    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_COLLECTION_INTERVAL_SECS)
    }

    pub fn memory_warning_percent(&self) -> u8 {
        self.memory_warning_percent
            .filter(|p| (1..=100).contains(p))
            .unwrap_or(DEFAULT_MEMORY_WARNING_PERCENT)
    }
}

impl ConfigFile {
    /// Load config from file, automatically detecting format from extension
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigNotFound(path.to_path_buf()));
        }

        let format = ConfigFormat::from_path(path).ok_or_else(|| {
            Error::ConfigError(format!(
                "Unsupported config file extension: {}. Expected .toml, .yaml, .yml, or .json",
                path.display()
            ))
        })?;

        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content, format)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse config content with specified format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
            ConfigFormat::Yaml => {
                // An empty YAML document is null, not an empty map
                if content.trim().is_empty() {
                    return Ok(Self::default());
                }
                Ok(serde_yaml::from_str(content)?)
            }
            ConfigFormat::Json => Ok(serde_json::from_str(content)?),
        }
    }

    /// Find and load the first config file present in `dir`
    pub fn find_and_load(dir: &Path) -> Result<(Self, PathBuf)> {
        for name in CONFIG_FILES {
            let path = dir.join(name);
            if path.exists() {
                let config = Self::load(&path)?;
                return Ok((config, path));
            }
        }
        Err(Error::ConfigError(format!(
            "No config file found in {}. Expected one of: {:?}",
            dir.display(),
            CONFIG_FILES
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_config_format_detection() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("yaml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_extension("JSON"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_config_parse_toml() {
        let config_content = r#"
[logging]
file_name = "app.log"
max_file_size_mb = 2
max_backup_files = 3
directory = "/var/log/netmon"

[monitor]
initial_delay_secs = 1
interval_secs = 30
"#;
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.logging.file_name(), "app.log");
        assert_eq!(config.logging.max_file_size_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.logging.max_backup_files(), 3);
        assert_eq!(config.logging.directory(), PathBuf::from("/var/log/netmon"));
        assert_eq!(config.monitor.initial_delay_secs(), 1);
        assert_eq!(config.monitor.interval_secs(), 30);
    }

    #[test]
    fn test_config_parse_yaml() {
        let config_content = r#"
logging:
  file_name: yaml.log
  max_file_size_bytes: 4096
  max_backup_files: 0
"#;
        let mut file = NamedTempFile::with_suffix(".yml").unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.logging.file_name(), "yaml.log");
        assert_eq!(config.logging.max_file_size_bytes(), 4096);
        assert_eq!(config.logging.max_backup_files(), 0);
        assert_eq!(config.logging.directory(), PathBuf::from("logs"));
        assert_eq!(config.monitor.interval_secs(), DEFAULT_COLLECTION_INTERVAL_SECS);
    }

    #[test]
    fn test_config_parse_json() {
        let config_content = r#"
{
    "logging": { "file_name": "json.log", "max_file_size_mb": 1 },
    "monitor": { "memory_warning_percent": 75 }
}
"#;
        let mut file = NamedTempFile::with_suffix(".json").unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.logging.file_name(), "json.log");
        assert_eq!(config.logging.max_file_size_bytes(), 1024 * 1024);
        assert_eq!(config.monitor.memory_warning_percent(), 75);
    }

    #[test]
    fn test_bytes_take_precedence_over_megabytes() {
        let config = ConfigFile::parse(
            "[logging]\nmax_file_size_mb = 3\nmax_file_size_bytes = 100\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.logging.max_file_size_bytes(), 100);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config_content = r#"
[logging]
file_name = "   "
max_file_size_mb = -4
max_backup_files = -1
directory = ""

[monitor]
interval_secs = "soon"
memory_warning_percent = 0
"#;
        let config = ConfigFile::parse(config_content, ConfigFormat::Toml).unwrap();
        assert_eq!(config.logging.file_name(), DEFAULT_LOG_FILE_NAME);
        assert_eq!(config.logging.max_file_size_bytes(), DEFAULT_LOG_MAX_SIZE);
        assert_eq!(config.logging.max_backup_files(), DEFAULT_LOG_MAX_FILES);
        assert_eq!(config.logging.directory(), PathBuf::from(DEFAULT_LOG_DIRECTORY));
        assert_eq!(config.monitor.interval_secs(), DEFAULT_COLLECTION_INTERVAL_SECS);
        assert_eq!(config.monitor.memory_warning_percent(), DEFAULT_MEMORY_WARNING_PERCENT);
    }

    #[test]
    fn test_wrong_type_falls_back_to_default() {
        let config = ConfigFile::parse(
            r#"{"logging": {"max_file_size_mb": "huge", "file_name": 7}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        assert_eq!(config.logging.max_file_size_bytes(), DEFAULT_LOG_MAX_SIZE);
        assert_eq!(config.logging.file_name(), DEFAULT_LOG_FILE_NAME);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ConfigFile::parse("", ConfigFormat::Toml).unwrap();
        assert_eq!(config.logging.file_name(), DEFAULT_LOG_FILE_NAME);
        assert_eq!(config.monitor.initial_delay_secs(), DEFAULT_INITIAL_DELAY_SECS);

        let config = ConfigFile::parse("", ConfigFormat::Yaml).unwrap();
        assert_eq!(config.logging.max_backup_files(), DEFAULT_LOG_MAX_FILES);
    }

    #[test]
    fn test_config_not_found() {
        let result = ConfigFile::load(Path::new("/nonexistent/netmon.toml"));
        assert!(matches!(result, Err(Error::ConfigNotFound(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = NamedTempFile::with_suffix(".ini").unwrap();
        let result = ConfigFile::load(file.path());
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_find_and_load_priority() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("netmon.json"), r#"{"logging":{"file_name":"b.log"}}"#)
            .unwrap();
        std::fs::write(dir.path().join("netmon.toml"), "[logging]\nfile_name = \"a.log\"\n")
            .unwrap();

        let (config, path) = ConfigFile::find_and_load(dir.path()).unwrap();
        assert_eq!(config.logging.file_name(), "a.log");
        assert!(path.ends_with("netmon.toml"));
    }

    #[test]
    fn test_find_and_load_missing() {
        let dir = TempDir::new().unwrap();
        assert!(ConfigFile::find_and_load(dir.path()).is_err());
    }
}
