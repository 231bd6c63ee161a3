//! Structured log file names: `<name>_<description>_<YYYYMMDD>_<seq>.log`.
//!
//! The date and sequence number are read from the right, so a description
//! may contain underscores. The name may not.

use std::fmt;

use chrono::NaiveDate;

use crate::clock::{date_token, parse_date_token};

/// Extension of every log file.
pub const LOG_EXTENSION: &str = "log";

/// The parts of a log file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogFileName {
    pub name: String,
    pub description: String,
    pub date: NaiveDate,
    pub seq: u32,
}

impl LogFileName {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
        seq: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            date,
            seq,
        }
    }

    pub fn to_file_name(&self) -> String {
        self.to_string()
    }

    /// Parse a bare file name. Returns `None` for anything that does not
    /// follow the scheme exactly, including archives and foreign files.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".log")?;

        let (rest, seq) = stem.rsplit_once('_')?;
        if seq.is_empty() || !seq.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let seq: u32 = seq.parse().ok()?;

        let (rest, date) = rest.rsplit_once('_')?;
        let date = parse_date_token(date)?;

        let (name, description) = rest.split_once('_')?;
        if name.is_empty() {
            return None;
        }

        Some(Self::new(name, description, date, seq))
    }

    /// Whether this file belongs to `name`/`description`. An empty filter
    /// matches anything.
    pub fn matches(&self, name: &str, description: &str) -> bool {
        (name.is_empty() || self.name == name)
            && (description.is_empty() || self.description == description)
    }
}

impl fmt::Display for LogFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}.{}",
            self.name,
            self.description,
            date_token(self.date),
            self.seq,
            LOG_EXTENSION
        )
    }
}
