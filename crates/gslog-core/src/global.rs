//! The process-wide default service.
//!
//! Created on first use from [`LogConfig::from_env`], unless [`init`] has
//! installed one earlier. Libraries that want isolation should take a
//! [`LogService`] reference instead of going through here.

use std::sync::{Arc, OnceLock};

use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::level::Level;
use crate::logger::Logger;
use crate::service::LogService;
use crate::sink::SinkRef;

static DEFAULT: OnceLock<LogService> = OnceLock::new();

/// Install `service` as the default instance.
///
/// Returns the service back if a default already exists.
pub fn init(service: LogService) -> Result<(), LogService> {
    DEFAULT.set(service)
}

/// The default service, creating it if needed.
pub fn service() -> LogResult<&'static LogService> {
    if let Some(service) = DEFAULT.get() {
        return Ok(service);
    }

    let config = LogConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring invalid GSLOG_* settings");
        LogConfig::default()
    });
    // Losing a race with another initializer drops (and stops) this one.
    let _ = DEFAULT.set(LogService::with_config(&config)?);
    DEFAULT.get().ok_or(LogError::ServiceClosed)
}

pub fn set_flags(flags: Level) -> LogResult<()> {
    service()?.set_flags(flags);
    Ok(())
}

pub fn set_sinks(sinks: Vec<SinkRef>) -> LogResult<()> {
    service()?.set_sinks(sinks);
    Ok(())
}

pub fn get_logger(name: &str) -> LogResult<Arc<Logger>> {
    Ok(service()?.get_logger(name))
}

/// Drain and stop the default service. Logging through it afterwards fails.
pub fn shutdown() -> LogResult<()> {
    service()?.shutdown();
    Ok(())
}
