//! File sink with date and size rotation.
//!
//! Files are named `<dir>/<name>_<description>_<YYYYMMDD>_<seq>.log`.
//!
//! ```text
//!   no file ──open──► file open ──date changed / size > cut──► no file
//!      ▲                                                        │
//!      └────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening walks the sequence number upwards, skipping files that cannot be
//! opened or are already past the cut size, for at most
//! `max_rotation_attempts` candidates. A new date starts again at sequence 0.
//! When no file can be opened the line is written to stdout instead and the
//! failure is returned to the dispatcher.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::RwLock;

use crate::clock::{Clock, SystemClock};
use crate::config::{LogConfig, DEFAULT_CUT_SIZE, DEFAULT_FILE_TIMESTAMP_FORMAT};
use crate::error::{LogError, LogResult};
use crate::file_name::LogFileName;
use crate::msg::Msg;
use crate::sink::Sink;

/// Default bound on files tried per rotation.
pub const DEFAULT_MAX_ROTATION_ATTEMPTS: u32 = 1024;

/// Tag written for levels that are not a single known bit.
const UNKNOWN_LEVEL_TAG: &str = "Uknown";

/// Settings for one [`FileSink`].
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    pub dir: PathBuf,
    pub name: String,
    pub description: String,
    /// Rotate once the current file is larger than this. `0` means the default.
    pub cut_size: u64,
    pub timestamp_format: String,
    pub max_rotation_attempts: u32,
}

impl FileSinkConfig {
    pub fn new(
        dir: impl Into<PathBuf>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            name: name.into(),
            description: description.into(),
            cut_size: DEFAULT_CUT_SIZE,
            timestamp_format: DEFAULT_FILE_TIMESTAMP_FORMAT.to_string(),
            max_rotation_attempts: DEFAULT_MAX_ROTATION_ATTEMPTS,
        }
    }

    /// Directory, cut size and timestamp format taken from `config`.
    pub fn from_log_config(
        config: &LogConfig,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            cut_size: config.cut_size,
            timestamp_format: config.timestamp_format.clone(),
            ..Self::new(config.log_dir.clone(), name, description)
        }
    }

    pub fn with_cut_size(mut self, cut_size: u64) -> Self {
        self.cut_size = cut_size;
        self
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = format.into();
        self
    }

    pub fn with_max_rotation_attempts(mut self, attempts: u32) -> Self {
        self.max_rotation_attempts = attempts;
        self
    }

    fn effective_cut_size(&self) -> u64 {
        if self.cut_size == 0 {
            DEFAULT_CUT_SIZE
        } else {
            self.cut_size
        }
    }
}

struct OpenFile {
    file: File,
    path: PathBuf,
    date: NaiveDate,
    size: u64,
}

struct FileState {
    file: Option<OpenFile>,
    date: NaiveDate,
    seq: u32,
    closed: bool,
}

/// A sink that appends formatted lines to rotating log files.
pub struct FileSink {
    config: FileSinkConfig,
    label: String,
    clock: Arc<dyn Clock>,
    state: RwLock<FileState>,
}

impl FileSink {
    /// Create the sink and its directory. No file is opened until the first
    /// message arrives.
    pub fn new(config: FileSinkConfig) -> LogResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: FileSinkConfig, clock: Arc<dyn Clock>) -> LogResult<Self> {
        if config.name.is_empty() || config.name.contains('_') {
            return Err(LogError::Config(format!(
                "log name {:?} must be non-empty and contain no '_'",
                config.name
            )));
        }
        ensure_dir(&config.dir)?;

        let label = format!("file:{}_{}", config.name, config.description);
        let date = clock.today();
        Ok(Self {
            config,
            label,
            clock,
            state: RwLock::new(FileState {
                file: None,
                date,
                seq: 0,
                closed: false,
            }),
        })
    }

    pub fn config(&self) -> &FileSinkConfig {
        &self.config
    }

    /// Path of the file currently open, if any.
    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.read().file.as_ref().map(|f| f.path.clone())
    }

    /// Close the current file. Later messages are refused.
    pub fn close(&self) {
        let mut state = self.state.write();
        if let Some(mut open) = state.file.take() {
            let _ = open.file.flush();
        }
        state.closed = true;
    }

    /// Return the file to write to, rotating first if needed.
    fn resolve<'a>(&self, state: &'a mut FileState) -> LogResult<&'a mut OpenFile> {
        let today = self.clock.today();
        let cut_size = self.config.effective_cut_size();

        let current = match state.file.take() {
            Some(open) if open.date != today => {
                tracing::debug!(path = %open.path.display(), "date changed, rotating log file");
                None
            }
            Some(open) if open.size > cut_size => {
                tracing::debug!(
                    path = %open.path.display(),
                    size = open.size,
                    cut_size,
                    "log file past cut size, rotating"
                );
                None
            }
            other => other,
        };

        if state.date != today {
            state.date = today;
            state.seq = 0;
        }

        let open = match current {
            Some(open) => open,
            None => self.open_next(state.date, &mut state.seq, cut_size)?,
        };
        Ok(state.file.insert(open))
    }

    fn open_next(&self, date: NaiveDate, seq: &mut u32, cut_size: u64) -> LogResult<OpenFile> {
        let first_seq = *seq;
        let mut last_path = PathBuf::new();

        for _ in 0..self.config.max_rotation_attempts {
            let file_name =
                LogFileName::new(&self.config.name, &self.config.description, date, *seq);
            let path = self.config.dir.join(file_name.to_file_name());
            *seq += 1;

            match open_within_limit(&path, cut_size) {
                Ok(Some((file, size))) => {
                    tracing::debug!(path = %path.display(), size, "opened log file");
                    return Ok(OpenFile {
                        file,
                        path,
                        date,
                        size,
                    });
                }
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "log file already full, skipping");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot open log file");
                }
            }
            last_path = path;
        }

        // The next message retries the same candidates.
        *seq = first_seq;
        Err(LogError::RotationExhausted {
            attempts: self.config.max_rotation_attempts,
            last_path,
        })
    }
}

impl Sink for FileSink {
    fn recv(&self, msg: &Msg) -> LogResult<()> {
        let mut line = msg.format_line(&self.config.timestamp_format, UNKNOWN_LEVEL_TAG);
        line.push('\n');

        let mut state = self.state.write();
        if state.closed {
            return Err(LogError::SinkClosed(self.label.clone()));
        }

        let written = match self.resolve(&mut state) {
            Ok(open) => match open.file.write_all(line.as_bytes()) {
                Ok(()) => {
                    open.size += line.len() as u64;
                    Ok(())
                }
                Err(e) => {
                    // Drop the handle so the next message tries a fresh file.
                    state.file = None;
                    Err(LogError::Io(e))
                }
            },
            Err(e) => Err(e),
        };

        if written.is_err() {
            let _ = std::io::stdout().lock().write_all(line.as_bytes());
        }
        written
    }

    fn flush(&self) -> LogResult<()> {
        if let Some(open) = self.state.write().file.as_mut() {
            open.file.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Create `dir`; an existing directory is fine.
pub(crate) fn ensure_dir(dir: &Path) -> LogResult<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(LogError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// Open `path` for appending; `None` if it is already past `cut_size`.
fn open_within_limit(path: &Path, cut_size: u64) -> std::io::Result<Option<(File, u64)>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let size = file.metadata()?.len();
    if size > cut_size {
        return Ok(None);
    }
    Ok(Some((file, size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callsite::CallSite;
    use crate::clock::ManualClock;
    use crate::level::Level;
    use crate::logger::Logger;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    fn msg(content: &str) -> Msg {
        Msg::new(
            Level::INFO,
            Logger::detached("unit"),
            CallSite::new("file_sink.rs", 1),
            content.to_string(),
        )
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            Local.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap(),
        ))
    }

    #[test]
    fn test_no_file_until_first_message() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::with_clock(
            FileSinkConfig::new(temp.path().join("logs"), "app", "main"),
            clock(),
        )
        .unwrap();

        assert!(temp.path().join("logs").is_dir());
        assert!(sink.current_path().is_none());

        sink.recv(&msg("hello")).unwrap();
        let path = sink.current_path().unwrap();
        assert!(path.ends_with("app_main_20240506_0.log"));

        let content = fs::read_to_string(path).unwrap();
        assert!(content.ends_with("(file_sink.rs:1):[I] unit -- hello\n"));
    }

    #[test]
    fn test_skips_files_already_full() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app_main_20240506_0.log"), vec![b'x'; 64]).unwrap();

        let sink = FileSink::with_clock(
            FileSinkConfig::new(temp.path(), "app", "main").with_cut_size(32),
            clock(),
        )
        .unwrap();
        sink.recv(&msg("after crash")).unwrap();

        assert!(sink
            .current_path()
            .unwrap()
            .ends_with("app_main_20240506_1.log"));
    }

    #[test]
    fn test_rotation_exhausted() {
        let temp = TempDir::new().unwrap();
        for seq in 0..3 {
            let path = temp.path().join(format!("app_main_20240506_{}.log", seq));
            fs::write(path, vec![b'x'; 64]).unwrap();
        }

        let sink = FileSink::with_clock(
            FileSinkConfig::new(temp.path(), "app", "main")
                .with_cut_size(32)
                .with_max_rotation_attempts(3),
            clock(),
        )
        .unwrap();

        let err = sink.recv(&msg("nowhere to go")).unwrap_err();
        match err {
            LogError::RotationExhausted {
                attempts,
                last_path,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_path.ends_with("app_main_20240506_2.log"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(sink.current_path().is_none());
    }

    #[test]
    fn test_exhausted_rotation_retries_same_sequence() {
        let temp = TempDir::new().unwrap();
        let full: Vec<_> = (0..2)
            .map(|seq| temp.path().join(format!("app_main_20240506_{}.log", seq)))
            .collect();
        for path in &full {
            fs::write(path, vec![b'x'; 64]).unwrap();
        }

        let sink = FileSink::with_clock(
            FileSinkConfig::new(temp.path(), "app", "main")
                .with_cut_size(32)
                .with_max_rotation_attempts(2),
            clock(),
        )
        .unwrap();

        for _ in 0..3 {
            match sink.recv(&msg("still stuck")).unwrap_err() {
                LogError::RotationExhausted { last_path, .. } => {
                    assert!(last_path.ends_with("app_main_20240506_1.log"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        // Once space frees up, numbering starts over from the beginning.
        for path in &full {
            fs::remove_file(path).unwrap();
        }
        sink.recv(&msg("recovered")).unwrap();
        assert!(sink
            .current_path()
            .unwrap()
            .ends_with("app_main_20240506_0.log"));
    }

    #[test]
    fn test_closed_sink_refuses() {
        let temp = TempDir::new().unwrap();
        let sink = FileSink::with_clock(FileSinkConfig::new(temp.path(), "app", "x"), clock())
            .unwrap();
        sink.recv(&msg("one")).unwrap();
        sink.close();

        assert!(sink.current_path().is_none());
        assert!(matches!(
            sink.recv(&msg("two")),
            Err(LogError::SinkClosed(_))
        ));
    }

    #[test]
    fn test_rejects_name_with_separator() {
        let temp = TempDir::new().unwrap();
        let result = FileSink::new(FileSinkConfig::new(temp.path(), "my_app", "x"));
        assert!(matches!(result, Err(LogError::Config(_))));
    }

    #[test]
    fn test_directory_creation_failure() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, b"not a dir").unwrap();

        let result = FileSink::new(FileSinkConfig::new(blocker.join("logs"), "app", "x"));
        assert!(matches!(result, Err(LogError::CreateDirectory { .. })));
    }
}
