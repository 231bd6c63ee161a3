//! Sinks consume finished messages.
//!
//! The dispatch thread calls [`Sink::recv`] once per message for every sink
//! attached to the message's logger. Calls are sequential, so a slow sink
//! delays every sink behind it.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::LogResult;
use crate::msg::Msg;

/// Default timestamp format for console output.
pub const DEFAULT_CONSOLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// A consumer of log messages.
pub trait Sink: Send + Sync {
    /// Consume one message.
    ///
    /// Errors are reported by the dispatcher and never reach the producer.
    fn recv(&self, msg: &Msg) -> LogResult<()>;

    /// Flush buffered output. Called once when the service shuts down.
    fn flush(&self) -> LogResult<()> {
        Ok(())
    }

    /// Name used when reporting failures of this sink.
    fn name(&self) -> &str;
}

/// Shared handle to a sink.
pub type SinkRef = Arc<dyn Sink>;

/// Writes every message to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    timestamp_format: String,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::with_timestamp_format(DEFAULT_CONSOLE_TIMESTAMP_FORMAT)
    }

    /// Use a chrono format string for the timestamp column.
    pub fn with_timestamp_format(format: impl Into<String>) -> Self {
        Self {
            timestamp_format: format.into(),
        }
    }

    /// Render the console line for `msg`.
    pub fn render(&self, msg: &Msg) -> String {
        format!(
            "{} ({}:{:02}) [{}] {} -- {}",
            msg.timestamp().format(&self.timestamp_format),
            msg.file(),
            msg.line(),
            msg.level().tag().unwrap_or("U"),
            msg.logger().name(),
            msg.content()
        )
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn recv(&self, msg: &Msg) -> LogResult<()> {
        let line = self.render(msg);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        Ok(())
    }

    fn flush(&self) -> LogResult<()> {
        std::io::stdout().lock().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// Keeps every received message in memory.
///
/// Handy in tests and for in-process inspection of what was logged.
#[derive(Debug, Default)]
pub struct MemorySink {
    name: String,
    messages: Mutex<Vec<Msg>>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            messages: Mutex::new(Vec::new()),
        })
    }

    /// All messages received so far, oldest first.
    pub fn messages(&self) -> Vec<Msg> {
        self.messages.lock().clone()
    }

    /// Just the content of every message, oldest first.
    pub fn contents(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .map(|m| m.content().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl Sink for MemorySink {
    fn recv(&self, msg: &Msg) -> LogResult<()> {
        self.messages.lock().push(msg.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
