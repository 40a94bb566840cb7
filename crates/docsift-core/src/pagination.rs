//! Whole-document versus per-page emission for paginated documents.

use std::fmt;

use crate::config::LargeDocThresholds;
use crate::types::{Method, PageRef, PassOutcome, Reliability, TextUnit};

/// How an accepted paginated document is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationMode {
    WholeDocument,
    PerPage,
}

/// The condition that forced per-page output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationTrigger {
    PageCount { pages: usize, threshold: usize },
    SizeBytes { bytes: u64, threshold: u64 },
    CharCount { chars: usize, threshold: usize },
    VisualRecognition,
}

impl fmt::Display for PaginationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageCount { pages, threshold } => write!(f, "page_count {} >= {}", pages, threshold),
            Self::SizeBytes { bytes, threshold } => write!(f, "size_bytes {} >= {}", bytes, threshold),
            Self::CharCount { chars, threshold } => write!(f, "char_count {} >= {}", chars, threshold),
            Self::VisualRecognition => f.write_str("visual recognition used"),
        }
    }
}

/// Result of [`PaginationPolicy::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationDecision {
    pub mode: PaginationMode,
    /// First condition that forced per-page output, if any.
    pub trigger: Option<PaginationTrigger>,
}

impl fmt::Display for PaginationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mode, self.trigger) {
            (PaginationMode::PerPage, Some(t)) => write!(f, "per-page ({})", t),
            (PaginationMode::PerPage, None) => f.write_str("per-page"),
            (PaginationMode::WholeDocument, _) => f.write_str("whole-document"),
        }
    }
}

/// Pagination thresholds.
#[derive(Debug, Clone, Copy)]
pub struct PaginationPolicy {
    thresholds: LargeDocThresholds,
}

impl Default for PaginationPolicy {
    fn default() -> Self {
        Self::new(LargeDocThresholds::default())
    }
}

impl PaginationPolicy {
    pub fn new(thresholds: LargeDocThresholds) -> Self {
        Self { thresholds }
    }

    /// Decide the emission mode for one document.
    pub fn decide(
        &self,
        page_count: usize,
        size_bytes: u64,
        total_chars: usize,
        used_visual_recognition: bool,
    ) -> PaginationDecision {
        let t = &self.thresholds;
        let trigger = if page_count >= t.page_count {
            Some(PaginationTrigger::PageCount {
                pages: page_count,
                threshold: t.page_count,
            })
        } else if size_bytes >= t.size_bytes {
            Some(PaginationTrigger::SizeBytes {
                bytes: size_bytes,
                threshold: t.size_bytes,
            })
        } else if total_chars >= t.char_count {
            Some(PaginationTrigger::CharCount {
                chars: total_chars,
                threshold: t.char_count,
            })
        } else if used_visual_recognition {
            Some(PaginationTrigger::VisualRecognition)
        } else {
            None
        };

        PaginationDecision {
            mode: if trigger.is_some() {
                PaginationMode::PerPage
            } else {
                PaginationMode::WholeDocument
            },
            trigger,
        }
    }

    /// Shape the accepted outcome into output units.
    ///
    /// Whole-document mode folds all pages into one unit scored with the
    /// acceptance aggregate.
    pub fn apply(
        &self,
        decision: &PaginationDecision,
        outcome: PassOutcome,
        source: &str,
        method: Method,
        aggregate: f64,
    ) -> Vec<TextUnit> {
        match decision.mode {
            PaginationMode::PerPage => outcome.units,
            PaginationMode::WholeDocument => {
                let text = outcome
                    .units
                    .iter()
                    .map(|u| u.text.trim_end())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                vec![TextUnit::new(
                    source,
                    PageRef::Whole,
                    text,
                    method,
                    Reliability::new(aggregate),
                )]
            }
        }
    }
}
