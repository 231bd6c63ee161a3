//! The dispatch service.
//!
//! One bounded queue, one background thread. Producers push messages through
//! their [`Logger`]; the dispatch thread pops them in FIFO order and hands
//! each one to every sink attached to the message's logger at that moment.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  log_i!(..)   ┌──────────────────────┐
//! │ Logger "net" │ ────────────► │ bounded queue (Msg)  │  send blocks when full
//! │ Logger "db"  │ ────────────► │                      │
//! └──────────────┘               └──────────┬───────────┘
//!                                           │ FIFO
//!                                ┌──────────▼───────────┐
//!                                │ gslog-dispatch thread │
//!                                │  for sink in          │
//!                                │    msg.logger.sinks() │
//!                                └──────────┬───────────┘
//!                                           ▼
//!                                console / file / memory
//! ```
//!
//! Global flags and sinks live in a registry behind one mutex. Updating them
//! overwrites the matching field on every registered logger.

use std::collections::{HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::level::Level;
use crate::logger::{Logger, LoggerConfig};
use crate::msg::Msg;
use crate::sink::{ConsoleSink, SinkRef};

/// Default capacity of the dispatch queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 56;

/// Name of the background dispatch thread.
pub const DISPATCH_THREAD_NAME: &str = "gslog-dispatch";

/// Counters kept by the dispatch thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages taken off the queue and fanned out
    pub delivered: u64,
    /// Sink calls that returned an error or panicked
    pub sink_failures: u64,
}

#[derive(Default)]
struct Counters {
    delivered: AtomicU64,
    sink_failures: AtomicU64,
}

struct Registry {
    flags: Level,
    sinks: Vec<SinkRef>,
    loggers: HashMap<String, Arc<Logger>>,
}

/// State shared between the service handle and its loggers.
pub(crate) struct ServiceShared {
    /// `None` once shutdown has started.
    tx: RwLock<Option<Sender<Msg>>>,
    registry: Mutex<Registry>,
}

impl ServiceShared {
    /// Queue a message, blocking while the queue is full.
    pub(crate) fn dispatch(&self, msg: Msg) -> LogResult<()> {
        // Clone the sender so a blocked producer does not hold the lock
        // that shutdown needs.
        let tx = self.tx.read().clone().ok_or(LogError::ServiceClosed)?;
        tx.send(msg).map_err(|_| LogError::ServiceClosed)
    }
}

/// Owns the dispatch queue, the background thread and the logger registry.
///
/// Construct one at process start and share it, or use the default instance
/// in [`crate::global`]. Tests build their own isolated instances.
pub struct LogService {
    shared: Arc<ServiceShared>,
    counters: Arc<Counters>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl LogService {
    /// Create a service whose loggers write to the console by default.
    pub fn new(capacity: usize) -> LogResult<Self> {
        Self::with_sinks(capacity, Level::ALL, vec![Arc::new(ConsoleSink::new())])
    }

    /// Create a service from configuration.
    pub fn with_config(config: &LogConfig) -> LogResult<Self> {
        let console = ConsoleSink::with_timestamp_format(config.console_timestamp_format.clone());
        Self::with_sinks(config.queue_capacity, config.flags, vec![Arc::new(console)])
    }

    /// Create a service with explicit global defaults.
    ///
    /// Fails only if the dispatch thread cannot be spawned.
    pub fn with_sinks(capacity: usize, flags: Level, sinks: Vec<SinkRef>) -> LogResult<Self> {
        let (tx, rx) = channel::bounded(capacity);
        let counters = Arc::new(Counters::default());

        let worker_counters = counters.clone();
        let worker = thread::Builder::new()
            .name(DISPATCH_THREAD_NAME.to_string())
            .spawn(move || run(rx, &worker_counters))?;

        tracing::debug!(capacity, "log service started");

        Ok(Self {
            shared: Arc::new(ServiceShared {
                tx: RwLock::new(Some(tx)),
                registry: Mutex::new(Registry {
                    flags,
                    sinks,
                    loggers: HashMap::new(),
                }),
            }),
            counters,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Queue a message built elsewhere.
    ///
    /// Blocks while the queue is full. Fails with [`LogError::ServiceClosed`]
    /// once [`shutdown`](Self::shutdown) has begun.
    pub fn dispatch(&self, msg: Msg) -> LogResult<()> {
        self.shared.dispatch(msg)
    }

    /// Global level mask applied to new loggers.
    pub fn flags(&self) -> Level {
        self.shared.registry.lock().flags
    }

    /// Set the global level mask and overwrite it on every registered logger.
    pub fn set_flags(&self, flags: Level) {
        let mut registry = self.shared.registry.lock();
        registry.flags = flags;
        for logger in registry.loggers.values() {
            logger.set_flags(flags);
        }
    }

    /// Global sink list applied to new loggers.
    pub fn sinks(&self) -> Vec<SinkRef> {
        self.shared.registry.lock().sinks.clone()
    }

    /// Set the global sink list and overwrite it on every registered logger.
    pub fn set_sinks(&self, sinks: Vec<SinkRef>) {
        let mut registry = self.shared.registry.lock();
        for logger in registry.loggers.values() {
            logger.set_sinks(sinks.clone());
        }
        registry.sinks = sinks;
    }

    /// Return the logger called `name`, creating and registering it with the
    /// current global flags and sinks on first use.
    pub fn get_logger(&self, name: &str) -> Arc<Logger> {
        let mut registry = self.shared.registry.lock();
        if let Some(logger) = registry.loggers.get(name) {
            return logger.clone();
        }

        let logger = Logger::attached(
            name,
            LoggerConfig {
                flags: registry.flags,
                sinks: registry.sinks.clone(),
            },
            Arc::downgrade(&self.shared),
        );
        registry.loggers.insert(name.to_string(), logger.clone());
        tracing::debug!(logger = name, "registered logger");
        logger
    }

    /// Names of every registered logger, sorted.
    pub fn loggers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.registry.lock().loggers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Reset every registered logger to the current global flags and sinks.
    pub fn reset_loggers(&self) {
        let registry = self.shared.registry.lock();
        for logger in registry.loggers.values() {
            logger.replace(LoggerConfig {
                flags: registry.flags,
                sinks: registry.sinks.clone(),
            });
        }
    }

    /// Messages delivered and sink failures seen so far.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.counters.delivered.load(Ordering::Acquire),
            sink_failures: self.counters.sink_failures.load(Ordering::Acquire),
        }
    }

    /// Whether shutdown has begun.
    pub fn is_closed(&self) -> bool {
        self.shared.tx.read().is_none()
    }

    /// Close the queue and wait until every message queued before this call
    /// has been delivered, then flush all sinks.
    ///
    /// Calling it again is a no-op.
    pub fn shutdown(&self) {
        let tx = self.shared.tx.write().take();
        let Some(tx) = tx else {
            return;
        };
        drop(tx);

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("dispatch thread terminated abnormally");
            }
        }

        self.flush_sinks();
        tracing::debug!(delivered = self.stats().delivered, "log service stopped");
    }

    fn flush_sinks(&self) {
        let sinks = {
            let registry = self.shared.registry.lock();
            let mut seen = HashSet::new();
            let mut sinks = Vec::new();
            let all = registry
                .sinks
                .iter()
                .cloned()
                .chain(registry.loggers.values().flat_map(|l| l.sinks()));
            for sink in all {
                if seen.insert(Arc::as_ptr(&sink) as *const () as usize) {
                    sinks.push(sink);
                }
            }
            sinks
        };

        for sink in sinks {
            if let Err(e) = sink.flush() {
                tracing::warn!(sink = sink.name(), error = %e, "sink flush failed");
            }
        }
    }
}

impl Drop for LogService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(rx: Receiver<Msg>, counters: &Counters) {
    // Ends once every sender is gone and the queue is empty.
    for msg in rx.iter() {
        let config = msg.logger().snapshot();
        for sink in &config.sinks {
            if !deliver(sink, &msg) {
                counters.sink_failures.fetch_add(1, Ordering::AcqRel);
            }
        }
        counters.delivered.fetch_add(1, Ordering::AcqRel);
    }
}

/// Hand `msg` to one sink, containing any error or panic.
fn deliver(sink: &SinkRef, msg: &Msg) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.recv(msg))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!(
                sink = sink.name(),
                logger = msg.logger().name(),
                error = %e,
                "sink failed to record message"
            );
            false
        }
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            let err = LogError::SinkPanicked {
                sink: sink.name().to_string(),
                reason,
            };
            tracing::error!(logger = msg.logger().name(), error = %err, "sink panicked");
            false
        }
    }
}
