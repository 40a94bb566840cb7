//! Review area for inputs that could not be processed.
//!
//! A quarantined file is moved into the run's review directory and exactly one
//! row is appended to `review_manifest.csv`. If the row cannot be made durable
//! the file is moved back, so a file never sits in review without its reason.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::{SiftError, SiftResult};
use crate::types::ReasonCode;

/// Manifest file name inside the run output directory.
pub const MANIFEST_FILE: &str = "review_manifest.csv";

const MANIFEST_HEADER: [&str; 5] = ["filename", "reason_code", "note", "stored_as", "timestamp"];

/// One manifest row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineRecord {
    /// Original file name.
    pub filename: String,
    pub reason_code: ReasonCode,
    pub note: String,
    /// Name inside the review directory (differs on collision).
    pub stored_as: String,
    pub timestamp: DateTime<Utc>,
}

/// Moves files into review and keeps the manifest.
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    review_dir: PathBuf,
    manifest_path: PathBuf,
}

impl QuarantineManager {
    /// Manager for a run whose outputs live in `run_output`.
    pub fn new(run_output: &Path, review_dir_name: &str) -> Self {
        Self {
            review_dir: run_output.join(review_dir_name),
            manifest_path: run_output.join(MANIFEST_FILE),
        }
    }

    pub fn review_dir(&self) -> &Path {
        &self.review_dir
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Move `file` into review and record why.
    pub fn quarantine(
        &self,
        file: &Path,
        reason: ReasonCode,
        note: &str,
    ) -> SiftResult<QuarantineRecord> {
        fs::create_dir_all(&self.review_dir)
            .map_err(|e| SiftError::quarantine_move(e.to_string(), &self.review_dir))?;

        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| SiftError::quarantine_move("path has no file name", file))?;

        let now = Utc::now();
        let target = self.free_target(&filename, now);
        move_file(file, &target).map_err(|e| {
            SiftError::quarantine_move(format!("{} -> {}: {}", file.display(), target.display(), e), file)
        })?;

        let record = QuarantineRecord {
            filename,
            reason_code: reason,
            note: note.to_string(),
            stored_as: target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            timestamp: now,
        };

        if let Err(err) = self.append(&record) {
            error!(file = %record.filename, error = %err, "Manifest append failed, restoring file");
            if let Err(restore) = move_file(&target, file) {
                error!(
                    file = %record.filename,
                    error = %restore,
                    "Could not restore file after manifest failure"
                );
            }
            return Err(SiftError::quarantine_manifest(err.to_string(), &self.manifest_path));
        }

        info!(
            file = %record.filename,
            reason = %reason,
            stored_as = %record.stored_as,
            "Quarantined"
        );
        Ok(record)
    }

    /// Read all manifest rows.
    pub fn records(&self) -> SiftResult<Vec<QuarantineRecord>> {
        if !self.manifest_path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.manifest_path)?;
        let mut out = Vec::new();
        for row in reader.deserialize() {
            out.push(row?);
        }
        Ok(out)
    }

    fn free_target(&self, filename: &str, now: DateTime<Utc>) -> PathBuf {
        let direct = self.review_dir.join(filename);
        if !direct.exists() {
            return direct;
        }

        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| filename.to_string());
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let stamp = now.format("%Y%m%dT%H%M%S");

        let stamped = self.review_dir.join(format!("{}_{}{}", stem, stamp, ext));
        if !stamped.exists() {
            return stamped;
        }
        let mut n = 1u32;
        loop {
            let candidate = self
                .review_dir
                .join(format!("{}_{}_{}{}", stem, stamp, n, ext));
            if !candidate.exists() {
                return candidate;
            }
            n += 1;
        }
    }

    fn append(&self, record: &QuarantineRecord) -> SiftResult<()> {
        let needs_header = fs::metadata(&self.manifest_path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.manifest_path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(file);
        if needs_header {
            writer.write_record(MANIFEST_HEADER)?;
        }
        let timestamp = record.timestamp.to_rfc3339();
        writer.write_record([
            record.filename.as_str(),
            record.reason_code.as_str(),
            record.note.as_str(),
            record.stored_as.as_str(),
            timestamp.as_str(),
        ])?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }
}

/// Rename, falling back to copy and remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            fs::copy(from, to)?;
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, PathBuf, QuarantineManager) {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir_all(&input).unwrap();
        fs::create_dir_all(&output).unwrap();
        let manager = QuarantineManager::new(&output, "Mandatory Review");
        (dir, input, manager)
    }

    #[test]
    fn test_quarantine_moves_and_records() {
        let (_dir, input, manager) = setup();
        let file = input.join("blank.pdf");
        fs::write(&file, b"%PDF").unwrap();

        let record = manager
            .quarantine(&file, ReasonCode::PassExhausted, "all rungs low")
            .unwrap();

        assert!(!file.exists());
        assert!(manager.review_dir().join("blank.pdf").exists());
        assert_eq!(record.stored_as, "blank.pdf");

        let rows = manager.records().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].reason_code, ReasonCode::PassExhausted);
        assert_eq!(rows[0].note, "all rungs low");
    }

    #[test]
    fn test_collision_never_overwrites() {
        let (_dir, input, manager) = setup();
        let file = input.join("scan.pdf");

        fs::write(&file, b"first").unwrap();
        manager.quarantine(&file, ReasonCode::Timeout, "one").unwrap();
        fs::write(&file, b"second").unwrap();
        let second = manager.quarantine(&file, ReasonCode::Timeout, "two").unwrap();
        fs::write(&file, b"third").unwrap();
        let third = manager.quarantine(&file, ReasonCode::Timeout, "three").unwrap();

        assert_ne!(second.stored_as, "scan.pdf");
        assert!(second.stored_as.starts_with("scan_"));
        assert!(second.stored_as.ends_with(".pdf"));
        assert_ne!(second.stored_as, third.stored_as);
        assert_eq!(
            fs::read(manager.review_dir().join("scan.pdf")).unwrap(),
            b"first"
        );
        assert_eq!(
            fs::read(manager.review_dir().join(&third.stored_as)).unwrap(),
            b"third"
        );
        assert_eq!(manager.records().unwrap().len(), 3);
    }

    #[test]
    fn test_note_with_delimiters_round_trips() {
        let (_dir, input, manager) = setup();
        let file = input.join("odd.doc");
        fs::write(&file, b"x").unwrap();
        let note = "antiword: \"bad\", header\nsecond line";
        manager
            .quarantine(&file, ReasonCode::CorruptInput, note)
            .unwrap();
        assert_eq!(manager.records().unwrap()[0].note, note);
    }

    #[test]
    fn test_manifest_failure_restores_file() {
        let (_dir, input, manager) = setup();
        // A directory where the manifest should be makes the append fail.
        fs::create_dir_all(manager.manifest_path()).unwrap();
        let file = input.join("keep.pdf");
        fs::write(&file, b"x").unwrap();

        let err = manager
            .quarantine(&file, ReasonCode::PassExhausted, "n")
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::QrnManifestFailed);
        assert!(file.exists());
        assert!(!manager.review_dir().join("keep.pdf").exists());
    }

    #[test]
    fn test_missing_source_is_move_error() {
        let (_dir, input, manager) = setup();
        let err = manager
            .quarantine(&input.join("ghost.pdf"), ReasonCode::PassExhausted, "")
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::QrnMoveFailed);
        assert!(manager.records().unwrap().is_empty());
    }
}
