//! Input units, text units and pass outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use super::method::Method;
use crate::scoring::{aggregate, share_at_or_above, AggregateMode};

/// Input category, which selects the escalation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// PDF and other paginated documents.
    Paginated,
    /// Modern word-processor packages (.docx).
    Office,
    /// Legacy word-processor binaries (.doc).
    Legacy,
    /// Plain text.
    PlainText,
    /// Raster images.
    Image,
}

impl Category {
    /// Map a lowercase extension (without the dot) to a category.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Category::Paginated),
            "docx" => Some(Category::Office),
            "doc" => Some(Category::Legacy),
            "txt" => Some(Category::PlainText),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "gif" | "webp" => {
                Some(Category::Image)
            }
            _ => None,
        }
    }
}

/// What the orchestrator does with a discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileClass {
    /// Run the category's ladder.
    Extract(Category),
    /// Delete immediately with an informational log line.
    AutoDelete,
    /// Never processed; always routed to review.
    ReviewOnly,
    /// Unknown extension; routed to review.
    Unsupported,
}

/// One file inside a run. Never mutated, only read.
#[derive(Debug, Clone)]
pub struct InputUnit {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// Lowercase extension without the dot (empty if none).
    pub extension: String,
    /// Ladder category.
    pub category: Category,
    /// Size in bytes at discovery.
    pub size_bytes: u64,
}

impl InputUnit {
    /// Build an input unit from a path, reading its size from the filesystem.
    pub fn from_path(path: impl Into<PathBuf>, category: Category) -> std::io::Result<Self> {
        let path = path.into();
        let size_bytes = std::fs::metadata(&path)?.len();
        Ok(Self {
            extension: extension_of(&path),
            path,
            category,
            size_bytes,
        })
    }

    /// File name used in the `filename` column.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lowercase extension of a path, without the dot.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Page pointer for a text unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageRef {
    /// The unit covers the whole document.
    Whole,
    /// 1-based page, frame or embedded-image index.
    Index(u32),
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageRef::Whole => f.write_str("-"),
            PageRef::Index(i) => write!(f, "{}", i),
        }
    }
}

/// A reliability score, always inside [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Reliability(f64);

impl Reliability {
    /// Clamp a raw value into [0, 1]; NaN becomes 0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Raw value.
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// The atomic output of a successful extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextUnit {
    /// Source file name.
    pub source: String,
    /// Page pointer.
    pub page: PageRef,
    /// Extracted text.
    pub text: String,
    /// Producing method.
    pub method: Method,
    /// Reliability score.
    pub reliability: Reliability,
}

impl TextUnit {
    /// Create a new text unit.
    pub fn new(
        source: impl Into<String>,
        page: PageRef,
        text: impl Into<String>,
        method: Method,
        reliability: Reliability,
    ) -> Self {
        Self {
            source: source.into(),
            page,
            text: text.into(),
            method,
            reliability,
        }
    }

    /// Whether a visual-recognition method produced this unit.
    pub fn used_ocr(&self) -> bool {
        self.method.uses_visual_recognition()
    }

    /// Count of non-whitespace characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }
}

/// Transient result of one extraction pass.
#[derive(Debug, Clone, Default)]
pub struct PassOutcome {
    /// Candidate units, in page order.
    pub units: Vec<TextUnit>,
    /// Page count for paginated documents.
    pub page_count: Option<usize>,
    /// Free-form diagnostic from the pass.
    pub note: Option<String>,
}

impl PassOutcome {
    /// Create an outcome from candidate units.
    pub fn new(units: Vec<TextUnit>) -> Self {
        Self {
            units,
            page_count: None,
            note: None,
        }
    }

    /// Set the page count.
    pub fn with_page_count(mut self, page_count: usize) -> Self {
        self.page_count = Some(page_count);
        self
    }

    /// Attach a diagnostic note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Per-unit scores.
    pub fn scores(&self) -> Vec<f64> {
        self.units.iter().map(|u| u.reliability.value()).collect()
    }

    /// Aggregate score used for acceptance.
    pub fn aggregate(&self, mode: AggregateMode) -> f64 {
        aggregate(&self.scores(), mode)
    }

    /// Percentage of units at or above 0.5, for diagnostics only.
    pub fn share_reliable(&self) -> f64 {
        share_at_or_above(&self.scores(), 0.5)
    }

    /// Total non-whitespace characters across units.
    pub fn total_chars(&self) -> usize {
        self.units.iter().map(TextUnit::char_count).sum()
    }

    /// Whether any unit came from a visual-recognition method.
    pub fn used_visual_recognition(&self) -> bool {
        self.units.iter().any(TextUnit::used_ocr)
    }
}
