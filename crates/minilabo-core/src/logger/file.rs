//! Append-only log file with size-based rotation
//!
//! Flushes append to `logs/log_current.log`. When a flush leaves that file
//! larger than the size limit it is renamed to `logs/log_<millis>.log`, and
//! the next flush starts a fresh current file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::storage::{StorageError, StorageResult};

/// Result of appending to the log file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    /// Lines written by this append
    pub lines: usize,
    /// Size of the current file after the append
    pub file_size: u64,
    /// Where the current file was moved to, if it was rotated
    pub rotated_to: Option<PathBuf>,
}

/// The durable side of the ring logger
#[derive(Debug, Clone)]
pub struct LogFile {
    logs_dir: PathBuf,
    current: PathBuf,
    max_size: u64,
}

impl LogFile {
    pub fn new(config: &Config) -> Self {
        Self {
            logs_dir: config.logs_dir(),
            current: config.current_log_path(),
            max_size: config.log.file_max_size,
        }
    }

    /// Path flushes append to
    pub fn current_path(&self) -> &Path {
        &self.current
    }

    /// Append `lines` (one `\n` each) and rotate if the file grew too large
    pub fn append<I, S>(&self, lines: I, now_ms: u64) -> StorageResult<AppendReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = self.write_lines(lines)?;
        report.rotated_to = self.rotate_if_oversized(report.file_size, now_ms)?;
        Ok(report)
    }

    /// Append `lines` without rotating
    ///
    /// On success the lines are synced to disk.
    pub fn write_lines<I, S>(&self, lines: I) -> StorageResult<AppendReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let file = self.open_current()?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for line in lines {
            writeln!(writer, "{}", line.as_ref())
                .map_err(|e| StorageError::from_io(e, self.current.clone()))?;
            count += 1;
        }

        let file = writer
            .into_inner()
            .map_err(|e| StorageError::from_io(e.into_error(), self.current.clone()))?;
        file.sync_data()
            .map_err(|e| StorageError::from_io(e, self.current.clone()))?;
        let file_size = file
            .metadata()
            .map_err(|e| StorageError::from_io(e, self.current.clone()))?
            .len();

        Ok(AppendReport {
            lines: count,
            file_size,
            rotated_to: None,
        })
    }

    /// Move the current file aside when `file_size` exceeds the limit
    pub fn rotate_if_oversized(&self, file_size: u64, now_ms: u64) -> StorageResult<Option<PathBuf>> {
        if file_size > self.max_size {
            self.rotate(now_ms).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Open the current file for append, creating `logs/` on demand
    fn open_current(&self) -> StorageResult<File> {
        let open = || OpenOptions::new().create(true).append(true).open(&self.current);

        match open() {
            Ok(file) => Ok(file),
            Err(_) => {
                fs::create_dir_all(&self.logs_dir).map_err(|e| StorageError::CreateDirectory {
                    path: self.logs_dir.clone(),
                    source: e,
                })?;
                open().map_err(|e| StorageError::from_io(e, self.current.clone()))
            }
        }
    }

    /// Rename the current file to the first free `log_<ms>.log` or
    /// `log_<ms>_<n>.log`
    ///
    /// Timestamps restart at every boot, so an archive with the same stamp
    /// may already exist; it is never replaced.
    fn rotate(&self, now_ms: u64) -> StorageResult<PathBuf> {
        let archive = (0..MAX_ARCHIVES_PER_STAMP)
            .map(|n| self.logs_dir.join(archive_name(now_ms, n)))
            .find(|candidate| !candidate.exists())
            .ok_or_else(|| StorageError::AtomicWriteFailed {
                from: self.current.clone(),
                to: self.logs_dir.join(archive_name(now_ms, 0)),
                source: io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "no free archive name for this timestamp",
                ),
            })?;

        fs::rename(&self.current, &archive).map_err(|e| StorageError::AtomicWriteFailed {
            from: self.current.clone(),
            to: archive.clone(),
            source: e,
        })?;
        Ok(archive)
    }

    /// Archived files, oldest first
    pub fn archives(&self) -> StorageResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.logs_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StorageError::ReadError {
                    path: self.logs_dir.clone(),
                    source: e,
                })
            }
        };

        let mut archives: Vec<((u64, u32), PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                Some((parse_archive_name(&name)?, entry.path()))
            })
            .collect();
        archives.sort();

        Ok(archives.into_iter().map(|(_, path)| path).collect())
    }
}

/// Archives sharing one timestamp before rotation gives up
const MAX_ARCHIVES_PER_STAMP: u32 = 16;

fn archive_name(now_ms: u64, n: u32) -> String {
    if n == 0 {
        format!("log_{}.log", now_ms)
    } else {
        format!("log_{}_{}.log", now_ms, n)
    }
}

/// `(stamp, n)` of an archive file name
fn parse_archive_name(name: &str) -> Option<(u64, u32)> {
    let stem = name.strip_prefix("log_")?.strip_suffix(".log")?;
    match stem.split_once('_') {
        Some((stamp, n)) => Some((stamp.parse().ok()?, n.parse().ok()?)),
        None => Some((stem.parse().ok()?, 0)),
    }
}
