//! Level masks.
//!
//! Levels are bits, not an ordered scale: a logger can enable `ERROR` and
//! `VERBOSE` while leaving everything in between off.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::LogError;

bitflags! {
    /// Set of enabled log levels.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Level: u32 {
        const ASSERT = 1;
        const ERROR = 1 << 1;
        const WARN = 1 << 2;
        const INFO = 1 << 3;
        const DEBUG = 1 << 4;
        const VERBOSE = 1 << 5;
    }
}

impl Level {
    /// Every built-in level.
    pub const ALL: Level = Level::all();

    /// No level enabled.
    pub const NONE: Level = Level::empty();

    /// Single-letter tag for a single-bit level, `None` for anything else.
    pub fn tag(self) -> Option<&'static str> {
        match self {
            Level::ASSERT => Some("A"),
            Level::ERROR => Some("E"),
            Level::WARN => Some("W"),
            Level::INFO => Some("I"),
            Level::DEBUG => Some("D"),
            Level::VERBOSE => Some("V"),
            _ => None,
        }
    }

    fn lower_name(self) -> Option<&'static str> {
        match self {
            Level::ASSERT => Some("assert"),
            Level::ERROR => Some("error"),
            Level::WARN => Some("warn"),
            Level::INFO => Some("info"),
            Level::DEBUG => Some("debug"),
            Level::VERBOSE => Some("verbose"),
            _ => None,
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::ALL
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        if *self == Level::ALL {
            return f.write_str("all");
        }
        let names: Vec<&str> = self.iter().filter_map(Level::lower_name).collect();
        f.write_str(&names.join(","))
    }
}

/// Parses `"error,warn"`, `"E|W"`, `"all"` or `"none"` (case-insensitive).
impl FromStr for Level {
    type Err = LogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut level = Level::NONE;
        for part in s.split([',', '|']).map(str::trim).filter(|p| !p.is_empty()) {
            level |= match part.to_ascii_lowercase().as_str() {
                "all" => Level::ALL,
                "none" => Level::NONE,
                "assert" | "a" => Level::ASSERT,
                "error" | "e" => Level::ERROR,
                "warn" | "w" => Level::WARN,
                "info" | "i" => Level::INFO,
                "debug" | "d" => Level::DEBUG,
                "verbose" | "v" => Level::VERBOSE,
                _ => return Err(LogError::InvalidLevel(part.to_string())),
            };
        }
        Ok(level)
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
