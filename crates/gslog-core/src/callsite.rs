//! Call-site resolution for log messages.

use std::panic::Location;

/// Source location of a log call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    /// File name without its directory
    pub file: &'static str,
    /// Line number, `0` when unknown
    pub line: u32,
}

impl CallSite {
    /// Location used when the caller cannot be determined.
    pub const UNKNOWN: CallSite = CallSite {
        file: "???",
        line: 0,
    };

    /// Resolve the location of the caller.
    ///
    /// Every function between the log statement and this call must be
    /// `#[track_caller]`, otherwise the location of the first untracked
    /// frame is reported instead.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Build a call site from a `Location`, keeping only the file name.
    pub fn from_location(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }

    /// Build a call site from a raw path and line.
    pub fn new(path: &'static str, line: u32) -> Self {
        if path.is_empty() {
            return Self::UNKNOWN;
        }
        CallSite {
            file: short_file_name(path),
            line,
        }
    }
}

fn short_file_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
