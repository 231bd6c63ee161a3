//! The message envelope carried through the dispatch queue.

use std::fmt::Write as FmtWrite;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::callsite::CallSite;
use crate::level::Level;
use crate::logger::Logger;

/// A single log message.
///
/// Built by a [`Logger`] once the level check has passed, owned by the
/// queue until the dispatch thread picks it up, and only ever read by sinks.
#[derive(Clone)]
pub struct Msg {
    level: Level,
    timestamp: DateTime<Local>,
    logger: Arc<Logger>,
    site: CallSite,
    content: String,
}

impl Msg {
    /// Create a message stamped with the current local time.
    pub fn new(level: Level, logger: Arc<Logger>, site: CallSite, content: String) -> Self {
        Self::with_timestamp(level, Local::now(), logger, site, content)
    }

    /// Create a message with an explicit timestamp.
    pub fn with_timestamp(
        level: Level,
        timestamp: DateTime<Local>,
        logger: Arc<Logger>,
        site: CallSite,
        content: String,
    ) -> Self {
        Self {
            level,
            timestamp,
            logger,
            site,
            content,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// The logger that produced this message.
    ///
    /// The dispatch thread reads this logger's sink list when it delivers
    /// the message, not when it was queued.
    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }

    pub fn file(&self) -> &'static str {
        self.site.file
    }

    pub fn line(&self) -> u32 {
        self.site.line
    }

    pub fn site(&self) -> CallSite {
        self.site
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Render `"<ts> (<file>:<line>):[<tag>] <logger> -- <content>"`.
    ///
    /// `unknown_tag` is used when the level is not a single known bit.
    pub fn format_line(&self, timestamp_format: &str, unknown_tag: &str) -> String {
        let mut line = String::with_capacity(64 + self.content.len());
        let _ = write!(
            line,
            "{} ({}:{}):[{}] {} -- {}",
            self.timestamp.format(timestamp_format),
            self.site.file,
            self.site.line,
            self.level.tag().unwrap_or(unknown_tag),
            self.logger.name(),
            self.content
        );
        line
    }
}

impl std::fmt::Debug for Msg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Msg")
            .field("level", &self.level)
            .field("timestamp", &self.timestamp)
            .field("logger", &self.logger.name())
            .field("site", &self.site)
            .field("content", &self.content)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_line() {
        let logger = Logger::detached("net");
        let ts = Local.with_ymd_and_hms(2024, 3, 9, 8, 7, 6).unwrap();
        let msg = Msg::with_timestamp(
            Level::WARN,
            ts,
            logger,
            CallSite::new("src/conn.rs", 42),
            "peer dropped".to_string(),
        );

        assert_eq!(
            msg.format_line("%Y-%m-%d %H:%M:%S", "Uknown"),
            "2024-03-09 08:07:06 (conn.rs:42):[W] net -- peer dropped"
        );
    }

    #[test]
    fn test_unknown_tag_for_combined_bits() {
        let logger = Logger::detached("x");
        let msg = Msg::new(
            Level::WARN | Level::ERROR,
            logger,
            CallSite::UNKNOWN,
            "?".to_string(),
        );
        assert!(msg.format_line("%H", "Uknown").contains(":[Uknown] x -- ?"));
    }
}
