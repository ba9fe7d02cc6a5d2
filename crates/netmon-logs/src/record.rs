//! Log records and their one-line text rendering

use chrono::{Local, NaiveDateTime};
use std::fmt;
use std::str::FromStr;

/// ISO-8601 local date-time with a variable-width fractional second
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Severity of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ParseRecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            _ => Err(ParseRecordError::UnknownLevel(s.to_string())),
        }
    }
}

/// Error returned when a line is not a rendered [`Record`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseRecordError {
    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Malformed log line: {0}")]
    Malformed(String),
}

/// One logged event. Immutable once constructed.
///
/// Renders as `<timestamp> [<LEVEL>] [<source>] - <message>`. Newlines in
/// the message are written as-is, so such a record spans several lines
/// on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    timestamp: NaiveDateTime,
    level: Level,
    source: String,
    message: String,
}

impl Record {
    /// Create a record stamped with the current local time
    pub fn new(level: Level, message: impl Into<String>, source: impl Into<String>) -> Self {
        Self::with_timestamp(Local::now().naive_local(), level, message, source)
    }

    pub fn with_timestamp(
        timestamp: NaiveDateTime,
        level: Level,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Canonical one-line rendering, without a line terminator
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] [{}] - {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.source,
            self.message
        )
    }
}

impl FromStr for Record {
    type Err = ParseRecordError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseRecordError::Malformed(line.to_string());

        let (timestamp, rest) = line.split_once(" [").ok_or_else(malformed)?;
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| ParseRecordError::InvalidTimestamp(timestamp.to_string()))?;

        let (level, rest) = rest.split_once("] [").ok_or_else(malformed)?;
        let level = level.parse()?;

        let (source, message) = rest.split_once("] - ").ok_or_else(malformed)?;

        Ok(Self::with_timestamp(timestamp, level, message, source))
    }
}
