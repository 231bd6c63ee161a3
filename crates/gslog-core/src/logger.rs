//! Named loggers.
//!
//! A [`Logger`] carries its own level mask and sink list. Both live in one
//! copy-on-write [`LoggerConfig`] snapshot behind an `ArcSwap`, so a reader
//! always sees a mask and sink list that were set together, and concurrent
//! updates never tear.

use std::fmt;
use std::sync::{Arc, Weak};

use arc_swap::ArcSwap;

use crate::callsite::CallSite;
use crate::error::{LogError, LogResult};
use crate::level::Level;
use crate::msg::Msg;
use crate::service::ServiceShared;
use crate::sink::SinkRef;

/// Level mask and sink list of a logger, replaced as a whole.
#[derive(Clone, Default)]
pub struct LoggerConfig {
    pub flags: Level,
    pub sinks: Vec<SinkRef>,
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("LoggerConfig")
            .field("flags", &self.flags)
            .field("sinks", &names)
            .finish()
    }
}

/// A named source of log messages.
///
/// Obtain one from [`crate::LogService::get_logger`]; the service keeps it
/// registered for its whole lifetime.
pub struct Logger {
    name: String,
    config: ArcSwap<LoggerConfig>,
    this: Weak<Logger>,
    service: Weak<ServiceShared>,
}

impl Logger {
    pub(crate) fn attached(
        name: impl Into<String>,
        config: LoggerConfig,
        service: Weak<ServiceShared>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Logger {
            name: name.into(),
            config: ArcSwap::from_pointee(config),
            this: this.clone(),
            service,
        })
    }

    /// A logger that belongs to no service.
    ///
    /// Every level is enabled, but nothing it logs can be dispatched. Useful
    /// for building messages by hand, e.g. to drive a sink directly.
    pub fn detached(name: impl Into<String>) -> Arc<Self> {
        Self::attached(
            name,
            LoggerConfig {
                flags: Level::ALL,
                sinks: Vec::new(),
            },
            Weak::new(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> Level {
        self.config.load().flags
    }

    pub fn set_flags(&self, flags: Level) {
        self.config.rcu(|current| LoggerConfig {
            flags,
            sinks: current.sinks.clone(),
        });
    }

    /// The sinks currently attached to this logger.
    pub fn sinks(&self) -> Vec<SinkRef> {
        self.config.load().sinks.clone()
    }

    /// Replace this logger's sink list.
    pub fn set_sinks(&self, sinks: Vec<SinkRef>) {
        self.config.rcu(|current| LoggerConfig {
            flags: current.flags,
            sinks: sinks.clone(),
        });
    }

    /// Current mask and sink list as one consistent snapshot.
    pub fn snapshot(&self) -> Arc<LoggerConfig> {
        self.config.load_full()
    }

    pub(crate) fn replace(&self, config: LoggerConfig) {
        self.config.store(Arc::new(config));
    }

    /// Whether a message at `level` would be built right now.
    pub fn is_enabled(&self, level: Level) -> bool {
        !level.is_empty() && self.flags().contains(level)
    }

    /// Build and queue a message if `level` is enabled.
    ///
    /// Returns `Ok(())` without doing anything when the level is disabled.
    /// Fails with [`LogError::ServiceClosed`] if the owning service has shut
    /// down. May block while the dispatch queue is full.
    #[track_caller]
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) -> LogResult<()> {
        if !self.is_enabled(level) {
            return Ok(());
        }
        let site = CallSite::caller();

        let service = self.service.upgrade().ok_or(LogError::ServiceClosed)?;
        let this = self.this.upgrade().ok_or(LogError::ServiceClosed)?;
        service.dispatch(Msg::new(level, this, site, fmt::format(args)))
    }

    #[track_caller]
    fn write(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Err(e) = self.log(level, args) {
            tracing::error!(logger = %self.name, error = %e, "dropping log message");
        }
    }

    /// Log at VERBOSE.
    #[track_caller]
    pub fn v(&self, args: fmt::Arguments<'_>) {
        self.write(Level::VERBOSE, args);
    }

    /// Log at DEBUG.
    #[track_caller]
    pub fn d(&self, args: fmt::Arguments<'_>) {
        self.write(Level::DEBUG, args);
    }

    /// Log at INFO.
    #[track_caller]
    pub fn i(&self, args: fmt::Arguments<'_>) {
        self.write(Level::INFO, args);
    }

    /// Log at WARN.
    #[track_caller]
    pub fn w(&self, args: fmt::Arguments<'_>) {
        self.write(Level::WARN, args);
    }

    /// Log at ERROR.
    #[track_caller]
    pub fn e(&self, args: fmt::Arguments<'_>) {
        self.write(Level::ERROR, args);
    }

    /// Log at ASSERT.
    #[track_caller]
    pub fn a(&self, args: fmt::Arguments<'_>) {
        self.write(Level::ASSERT, args);
    }
}

impl fmt::Display for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("config", &**self.config.load())
            .finish()
    }
}

/// Log at VERBOSE: `log_v!(logger, "x = {}", x)`.
#[macro_export]
macro_rules! log_v {
    ($logger:expr, $($arg:tt)+) => {
        $logger.v(::std::format_args!($($arg)+))
    };
}

/// Log at DEBUG.
#[macro_export]
macro_rules! log_d {
    ($logger:expr, $($arg:tt)+) => {
        $logger.d(::std::format_args!($($arg)+))
    };
}

/// Log at INFO.
#[macro_export]
macro_rules! log_i {
    ($logger:expr, $($arg:tt)+) => {
        $logger.i(::std::format_args!($($arg)+))
    };
}

/// Log at WARN.
#[macro_export]
macro_rules! log_w {
    ($logger:expr, $($arg:tt)+) => {
        $logger.w(::std::format_args!($($arg)+))
    };
}

/// Log at ERROR.
#[macro_export]
macro_rules! log_e {
    ($logger:expr, $($arg:tt)+) => {
        $logger.e(::std::format_args!($($arg)+))
    };
}

/// Log at ASSERT.
#[macro_export]
macro_rules! log_a {
    ($logger:expr, $($arg:tt)+) => {
        $logger.a(::std::format_args!($($arg)+))
    };
}
