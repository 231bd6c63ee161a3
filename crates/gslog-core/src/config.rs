//! Configuration for services, file sinks and archiving.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LogError, LogResult};
use crate::level::Level;
use crate::service::DEFAULT_QUEUE_CAPACITY;
use crate::sink::DEFAULT_CONSOLE_TIMESTAMP_FORMAT;

/// Default size, in bytes, past which a log file is rotated.
pub const DEFAULT_CUT_SIZE: u64 = 20_000_000;

/// Default timestamp format for file output.
pub const DEFAULT_FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub const ENV_LOG_DIR: &str = "GSLOG_DIR";
pub const ENV_CUT_SIZE: &str = "GSLOG_CUT_SIZE";
pub const ENV_COMPRESS_DAY: &str = "GSLOG_COMPRESS_DAY";
pub const ENV_QUEUE: &str = "GSLOG_QUEUE";
pub const ENV_LEVEL: &str = "GSLOG_LEVEL";

/// Settings shared by the service, file sinks and the archiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Directory holding `.log` files and `.tar.gz` archives
    pub log_dir: PathBuf,
    /// Rotate once a file grows past this many bytes
    pub cut_size: u64,
    /// Days before today of the archive cutoff (0 = today, 1 = yesterday)
    pub compress_day_offset: i64,
    /// Capacity of the dispatch queue
    pub queue_capacity: usize,
    /// Global level mask for new loggers
    pub flags: Level,
    /// chrono format for timestamps in files
    pub timestamp_format: String,
    /// chrono format for timestamps on the console
    pub console_timestamp_format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            cut_size: DEFAULT_CUT_SIZE,
            compress_day_offset: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            flags: Level::ALL,
            timestamp_format: DEFAULT_FILE_TIMESTAMP_FORMAT.to_string(),
            console_timestamp_format: DEFAULT_CONSOLE_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

/// `~/.gslog/log`, or `./log` when there is no home directory.
pub fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".gslog").join("log"))
        .unwrap_or_else(|| PathBuf::from("log"))
}

impl LogConfig {
    /// Defaults overlaid with any `GSLOG_*` environment variables.
    pub fn from_env() -> LogResult<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to a value.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> LogResult<Self> {
        if let Some(dir) = lookup(ENV_LOG_DIR) {
            self.log_dir = PathBuf::from(dir);
        }
        if let Some(size) = lookup(ENV_CUT_SIZE) {
            self.cut_size = parse_var(ENV_CUT_SIZE, &size)?;
        }
        if let Some(days) = lookup(ENV_COMPRESS_DAY) {
            self.compress_day_offset = parse_var(ENV_COMPRESS_DAY, &days)?;
        }
        if let Some(capacity) = lookup(ENV_QUEUE) {
            self.queue_capacity = parse_var(ENV_QUEUE, &capacity)?;
        }
        if let Some(level) = lookup(ENV_LEVEL) {
            self.flags = level.parse()?;
        }
        Ok(self)
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_cut_size(mut self, cut_size: u64) -> Self {
        self.cut_size = cut_size;
        self
    }

    pub fn with_compress_day_offset(mut self, days: i64) -> Self {
        self.compress_day_offset = days;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> LogResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| LogError::Config(format!("{}={:?}: {}", key, value, e)))
}
