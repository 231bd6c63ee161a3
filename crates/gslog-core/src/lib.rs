//! gslog Core Library
//!
//! Named, leveled loggers whose messages are handed to sinks by a single
//! background dispatch thread.
//!
//! ## Overview
//!
//! - **Loggers** are looked up by name and carry their own level mask and
//!   sink list, seeded from the service's global defaults.
//! - **The service** owns a bounded FIFO queue. Producers block when it is
//!   full; nothing is ever dropped.
//! - **Sinks** receive each message synchronously on the dispatch thread:
//!   console, rotating files, or in-memory capture.
//! - **Archiving** bundles past-dated log files into `<YYYYMMDD>.tar.gz`
//!   and restores them.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use gslog_core::{log_i, log_w, FileSink, FileSinkConfig, Level, LogService};
//!
//! # fn main() -> Result<(), gslog_core::LogError> {
//! let service = LogService::new(256)?;
//! let file = FileSink::new(FileSinkConfig::new("/tmp/logs", "gateway", "main"))?;
//! service.set_sinks(vec![Arc::new(file)]);
//! service.set_flags(Level::ALL - Level::VERBOSE);
//!
//! let log = service.get_logger("net");
//! log_i!(log, "listening on {}", 8080);
//! log_w!(log, "slow peer {}", "10.0.0.7");
//!
//! service.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod callsite;
pub mod clock;
pub mod config;
pub mod error;
pub mod file_name;
pub mod file_sink;
pub mod global;
pub mod level;
pub mod logger;
pub mod msg;
pub mod service;
pub mod sink;

// Re-exports
pub use archive::{Archiver, CompressReport};
pub use callsite::CallSite;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::LogConfig;
pub use error::{LogError, LogResult};
pub use file_name::LogFileName;
pub use file_sink::{FileSink, FileSinkConfig};
pub use level::Level;
pub use logger::{Logger, LoggerConfig};
pub use msg::Msg;
pub use service::{DispatchStats, LogService};
pub use sink::{ConsoleSink, MemorySink, Sink, SinkRef};
