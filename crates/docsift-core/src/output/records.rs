//! Run record file writer.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ErrorCode, SiftError, SiftResult};
use crate::types::TextUnit;

/// Six-column header written to new record files.
pub const STANDARD_HEADER: [&str; 6] = ["filename", "page", "text", "method", "used_ocr", "reliability"];

/// Five-column header of older record files.
pub const LEGACY_HEADER: [&str; 5] = ["filename", "page", "text", "method", "used_ocr"];

/// Column layout of a record file. Fixed for the lifetime of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordLayout {
    /// Reliability in its own column.
    Standard,
    /// Reliability folded into the method cell as `method|rel=0.72`.
    Legacy,
}

/// Append-only, single-writer record file.
pub struct RecordWriter {
    path: PathBuf,
    layout: RecordLayout,
    writer: csv::Writer<File>,
    rows: usize,
}

impl std::fmt::Debug for RecordWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordWriter")
            .field("path", &self.path)
            .field("layout", &self.layout)
            .field("rows", &self.rows)
            .finish()
    }
}

impl RecordWriter {
    /// Open a record file.
    ///
    /// With `replace` the file is truncated. Otherwise an existing file keeps
    /// its layout and new rows are appended. New files use the standard
    /// layout unless `legacy` is set.
    pub fn open(path: impl Into<PathBuf>, replace: bool, legacy: bool) -> SiftResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| record_open_error(&path, e))?;
        }

        let existing = if replace {
            None
        } else {
            existing_layout(&path)?
        };

        let (layout, file, write_header) = match existing {
            Some(layout) => {
                let file = OpenOptions::new()
                    .append(true)
                    .open(&path)
                    .map_err(|e| record_open_error(&path, e))?;
                (layout, file, false)
            }
            None => {
                let file = File::create(&path).map_err(|e| record_open_error(&path, e))?;
                let layout = if legacy {
                    RecordLayout::Legacy
                } else {
                    RecordLayout::Standard
                };
                (layout, file, true)
            }
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Always)
            .from_writer(file);
        if write_header {
            match layout {
                RecordLayout::Standard => writer.write_record(STANDARD_HEADER)?,
                RecordLayout::Legacy => writer.write_record(LEGACY_HEADER)?,
            }
            writer.flush()?;
        }

        debug!(path = %path.display(), layout = ?layout, "Opened record file");
        Ok(Self {
            path,
            layout,
            writer,
            rows: 0,
        })
    }

    /// Append units and flush.
    pub fn write_units(&mut self, units: &[TextUnit]) -> SiftResult<()> {
        for unit in units {
            let page = unit.page.to_string();
            let used_ocr = if unit.used_ocr() { "true" } else { "false" };
            let reliability = format!("{:.2}", unit.reliability.value());
            match self.layout {
                RecordLayout::Standard => self.writer.write_record([
                    unit.source.as_str(),
                    page.as_str(),
                    unit.text.as_str(),
                    unit.method.as_str(),
                    used_ocr,
                    reliability.as_str(),
                ])?,
                RecordLayout::Legacy => {
                    let method = format!("{}|rel={}", unit.method, reliability);
                    self.writer.write_record([
                        unit.source.as_str(),
                        page.as_str(),
                        unit.text.as_str(),
                        method.as_str(),
                        used_ocr,
                    ])?
                }
            }
            self.rows += 1;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> RecordLayout {
        self.layout
    }

    /// Rows written through this writer.
    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

fn record_open_error(path: &Path, err: std::io::Error) -> SiftError {
    SiftError::Record {
        message: format!("cannot open {}: {}", path.display(), err),
        code: ErrorCode::RecOpenFailed,
        source: Some(Box::new(err)),
    }
}

fn existing_layout(path: &Path) -> SiftResult<Option<RecordLayout>> {
    match fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => {}
        _ => return Ok(None),
    }
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut header = csv::StringRecord::new();
    if !reader.read_record(&mut header)? {
        return Ok(None);
    }
    match header.len() {
        6 => Ok(Some(RecordLayout::Standard)),
        5 => Ok(Some(RecordLayout::Legacy)),
        n => Err(SiftError::Record {
            message: format!("{} has an unexpected {}-column header", path.display(), n),
            code: ErrorCode::RecOpenFailed,
            source: None,
        }),
    }
}
