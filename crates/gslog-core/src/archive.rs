//! Bundling old log files into dated `.tar.gz` archives, and restoring them.
//!
//! Not coordinated with live sinks: run it against files no sink is still
//! writing to.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use chrono::{Duration, NaiveDate};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::clock::{date_token, parse_date_token, Clock, SystemClock};
use crate::config::LogConfig;
use crate::error::{LogError, LogResult};
use crate::file_name::LogFileName;

/// Mode recorded when the platform has no Unix permission bits.
#[cfg(not(unix))]
const FALLBACK_FILE_MODE: u32 = 0o644;

/// What a [`Archiver::compress`] run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompressReport {
    /// The archive written, `None` when nothing qualified
    pub archive: Option<PathBuf>,
    /// Log files now inside the archive (and removed from the directory)
    pub archived: Vec<PathBuf>,
    /// `.log` files left alone because their names do not follow the scheme
    pub skipped: Vec<PathBuf>,
}

/// Compresses and restores log files in one directory.
pub struct Archiver {
    dir: PathBuf,
    day_offset: i64,
    clock: Arc<dyn Clock>,
}

impl Archiver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            day_offset: 0,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.log_dir.clone()).with_day_offset(config.compress_day_offset)
    }

    /// Archive files dated up to `days` before today.
    pub fn with_day_offset(mut self, days: i64) -> Self {
        self.day_offset = days;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Latest date that gets archived.
    pub fn cutoff(&self) -> LogResult<NaiveDate> {
        let today = self.clock.today();
        Duration::try_days(self.day_offset)
            .and_then(|offset| today.checked_sub_signed(offset))
            .ok_or_else(|| LogError::Config(format!("day offset {} out of range", self.day_offset)))
    }

    /// Every log file in the directory, ordered by date, name, description
    /// and sequence.
    pub fn list_logs(&self) -> LogResult<Vec<(PathBuf, LogFileName)>> {
        let (logs, _) = self.scan()?;
        Ok(logs)
    }

    /// Move log files dated on or before the cutoff into
    /// `<dir>/<cutoff>.tar.gz`.
    ///
    /// `name` and `description` restrict which files are taken; an empty
    /// string matches every value. The archive is created exclusively, and
    /// originals are removed only once it is completely written. If any step
    /// fails the partial archive is deleted and every original is kept.
    pub fn compress(&self, name: &str, description: &str) -> LogResult<CompressReport> {
        self.compress_with(name, description, |p: &Path| File::open(p))
    }

    /// [`compress`](Self::compress), reading each log file through `open`.
    fn compress_with<R, F>(
        &self,
        name: &str,
        description: &str,
        open: F,
    ) -> LogResult<CompressReport>
    where
        R: Read,
        F: Fn(&Path) -> io::Result<R>,
    {
        let cutoff = self.cutoff()?;
        let (logs, skipped) = self.scan()?;

        for path in &skipped {
            tracing::warn!(path = %path.display(), "log file name not recognised, not archiving");
        }

        let archived: Vec<PathBuf> = logs
            .into_iter()
            .filter(|(_, parsed)| parsed.date <= cutoff && parsed.matches(name, description))
            .map(|(path, _)| path)
            .collect();

        if archived.is_empty() {
            tracing::info!(cutoff = %cutoff, "no log files to archive");
            return Ok(CompressReport {
                archive: None,
                archived,
                skipped,
            });
        }

        let archive_path = self.archive_path(cutoff);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&archive_path)
            .map_err(|e| create_error(&archive_path, e))?;

        if let Err(e) = write_archive(file, &archived, open) {
            tracing::error!(archive = %archive_path.display(), error = %e, "archiving failed");
            if let Err(rm) = fs::remove_file(&archive_path) {
                tracing::warn!(archive = %archive_path.display(), error = %rm, "cannot remove partial archive");
            }
            return Err(e);
        }

        for path in &archived {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "cannot remove archived log file");
            }
        }

        tracing::info!(
            archive = %archive_path.display(),
            files = archived.len(),
            "archived log files"
        );
        Ok(CompressReport {
            archive: Some(archive_path),
            archived,
            skipped,
        })
    }

    /// Extract `<dir>/<day>.tar.gz` into the directory and delete it.
    ///
    /// `day` is `YYYYMMDD`. Fails without overwriting if a file of the same
    /// name already exists; files restored before the failure stay in place
    /// and the archive is kept.
    pub fn uncompress(&self, day: &str) -> LogResult<Vec<PathBuf>> {
        let date = parse_date_token(day).ok_or_else(|| LogError::InvalidDay(day.to_string()))?;
        let archive_path = self.archive_path(date);

        let file = File::open(&archive_path).map_err(|e| LogError::archive(&archive_path, e))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|e| LogError::archive(&archive_path, e))?;

        let mut restored = Vec::new();
        for entry in entries {
            let mut entry = entry.map_err(|e| LogError::archive(&archive_path, e))?;
            if !entry.header().entry_type().is_file() {
                continue;
            }

            let entry_path = entry
                .path()
                .map_err(|e| LogError::archive(&archive_path, e))?
                .into_owned();
            let file_name = plain_file_name(&entry_path).ok_or_else(|| {
                LogError::archive(&entry_path, "archive entry is not a plain file name")
            })?;

            let target = self.dir.join(file_name);
            let mut out = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&target)
                .map_err(|e| create_error(&target, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| LogError::archive(&target, e))?;
            out.flush().map_err(|e| LogError::archive(&target, e))?;

            tracing::debug!(path = %target.display(), "restored log file");
            restored.push(target);
        }

        fs::remove_file(&archive_path).map_err(|e| LogError::archive(&archive_path, e))?;
        tracing::info!(archive = %archive_path.display(), files = restored.len(), "restored archive");
        Ok(restored)
    }

    fn archive_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("{}.tar.gz", date_token(date)))
    }

    /// Parsed log files, plus `.log` files whose names did not parse.
    #[allow(clippy::type_complexity)]
    fn scan(&self) -> LogResult<(Vec<(PathBuf, LogFileName)>, Vec<PathBuf>)> {
        let mut logs = Vec::new();
        let mut skipped = Vec::new();

        let read_dir = fs::read_dir(&self.dir).map_err(|e| LogError::archive(&self.dir, e))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| LogError::archive(&self.dir, e))?;
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match LogFileName::parse(file_name) {
                Some(parsed) => logs.push((path, parsed)),
                None if file_name.ends_with(".log") => skipped.push(path),
                None => {}
            }
        }

        logs.sort_by(|(_, a), (_, b)| {
            (a.date, &a.name, &a.description, a.seq).cmp(&(b.date, &b.name, &b.description, b.seq))
        });
        skipped.sort();
        Ok((logs, skipped))
    }
}

fn write_archive<R, F>(file: File, paths: &[PathBuf], open: F) -> LogResult<()>
where
    R: Read,
    F: Fn(&Path) -> io::Result<R>,
{
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    for path in paths {
        let meta = fs::metadata(path).map_err(|e| LogError::archive(path, e))?;
        let src = open(path).map_err(|e| LogError::archive(path, e))?;
        let name = path
            .file_name()
            .ok_or_else(|| LogError::archive(path, "no file name"))?;

        let mut header = tar::Header::new_gnu();
        header.set_size(meta.len());
        header.set_mode(file_mode(&meta));
        header.set_mtime(
            meta.modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0),
        );

        // Never copy more than the header announces.
        builder
            .append_data(&mut header, name, src.take(meta.len()))
            .map_err(|e| LogError::archive(path, e))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| LogError::archive("<archive>", e))?;
    let file = encoder
        .finish()
        .map_err(|e| LogError::archive("<archive>", e))?;
    file.sync_all()
        .map_err(|e| LogError::archive("<archive>", e))?;
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    FALLBACK_FILE_MODE
}

fn create_error(path: &Path, e: io::Error) -> LogError {
    if e.kind() == io::ErrorKind::AlreadyExists {
        LogError::AlreadyExists(path.to_path_buf())
    } else {
        LogError::archive(path, e)
    }
}

/// The single normal component of `path`, rejecting anything with
/// directories, `..` or a root.
fn plain_file_name(path: &Path) -> Option<&std::ffi::OsStr> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => Some(name),
        _ => None,
    }
}
