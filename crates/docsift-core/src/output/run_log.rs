//! Durable human-readable run log.

use chrono::Utc;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SiftResult;
use crate::types::{Method, ReasonCode};

/// Log file name inside the run output directory.
pub const RUN_LOG_FILE: &str = "run.log";

/// Final outcome for one file.
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    Accepted {
        method: Method,
        score: f64,
        rows: usize,
        pagination: Option<String>,
    },
    Quarantined {
        reason: ReasonCode,
        note: String,
    },
    AutoDeleted,
}

impl Disposition {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Disposition::Accepted { .. })
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Accepted {
                method,
                score,
                rows,
                pagination,
            } => {
                write!(f, "accepted method={} score={:.2} rows={}", method, score, rows)?;
                if let Some(p) = pagination {
                    write!(f, " pagination={}", p)?;
                }
                Ok(())
            }
            Disposition::Quarantined { reason, note } => {
                write!(f, "quarantined reason={} note={}", reason, note.replace('\n', " "))
            }
            Disposition::AutoDeleted => f.write_str("deleted (auto-delete extension)"),
        }
    }
}

/// Append-only run log with timestamped lines.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    pub fn open(path: impl Into<PathBuf>) -> SiftResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one timestamped line.
    pub fn line(&mut self, message: impl fmt::Display) -> SiftResult<()> {
        writeln!(
            self.file,
            "{} {}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            message
        )?;
        self.file.flush()?;
        Ok(())
    }

    pub fn started(&mut self, run: &str, files: usize) -> SiftResult<()> {
        self.line(format_args!("START run={} files={}", run, files))
    }

    pub fn disposition(&mut self, file: &str, disposition: &Disposition) -> SiftResult<()> {
        self.line(format_args!("{} {}", file, disposition))
    }

    pub fn finished(&mut self, run: &str, accepted: usize, quarantined: usize, deleted: usize) -> SiftResult<()> {
        self.line(format_args!(
            "END run={} accepted={} quarantined={} auto_deleted={}",
            run, accepted, quarantined, deleted
        ))
    }
}
