//! Per-file processing: classify, escalate, paginate.
//!
//! Only paginated documents go through the pagination policy. Other
//! categories keep the units their pass produced.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use docsift_core::{
    Accepted, Category, EscalationEngine, FileClass, InputUnit, LadderSet, Method,
    PaginationDecision, PaginationPolicy, ReasonCode, SiftConfig, TextUnit, Unrecoverable,
};

/// What processing concluded about one file. Nothing has been moved,
/// deleted or written yet; that is the orchestrator's job.
#[derive(Debug)]
pub enum FileResult {
    Accepted {
        method: Method,
        score: f64,
        /// Set for paginated documents only.
        decision: Option<PaginationDecision>,
        units: Vec<TextUnit>,
    },
    Unrecoverable {
        reason: ReasonCode,
        note: String,
    },
    AutoDelete,
}

impl FileResult {
    fn unrecoverable(reason: ReasonCode, note: impl Into<String>) -> Self {
        Self::Unrecoverable {
            reason,
            note: note.into(),
        }
    }
}

/// Stateless per-file pipeline shared by every run.
pub struct FileProcessor {
    config: Arc<SiftConfig>,
    ladders: Arc<LadderSet>,
    policy: PaginationPolicy,
}

impl FileProcessor {
    pub fn new(config: Arc<SiftConfig>, ladders: LadderSet) -> Self {
        let policy = PaginationPolicy::new(config.large);
        Self {
            config,
            ladders: Arc::new(ladders),
            policy,
        }
    }

    /// Process one file with `engine`, whose scratch root is the run's scratch.
    pub async fn process(&self, engine: &EscalationEngine, path: &Path) -> (PathBuf, FileResult) {
        let result = match self.config.classify(path) {
            FileClass::AutoDelete => FileResult::AutoDelete,
            FileClass::ReviewOnly => {
                FileResult::unrecoverable(ReasonCode::UnsupportedExtension, "review-only type")
            }
            FileClass::Unsupported => FileResult::unrecoverable(
                ReasonCode::UnsupportedExtension,
                format!("unsupported extension '{}'", extension_label(path)),
            ),
            FileClass::Extract(category) => match InputUnit::from_path(path, category) {
                Err(e) => FileResult::unrecoverable(ReasonCode::CorruptInput, format!("cannot read input: {}", e)),
                Ok(unit) => match self.ladders.get(category) {
                    None => FileResult::unrecoverable(
                        ReasonCode::CapabilityUnavailable,
                        format!("no ladder configured for {:?}", category),
                    ),
                    Some(ladder) => match engine.escalate(&unit, ladder).await {
                        Ok(accepted) if category == Category::Paginated => {
                            self.paginate(&unit, accepted)
                        }
                        Ok(Accepted {
                            outcome,
                            method,
                            score,
                            ..
                        }) => FileResult::Accepted {
                            method,
                            score,
                            decision: None,
                            units: outcome.units,
                        },
                        Err(Unrecoverable { reason, note, .. }) => {
                            debug!(file = %unit.file_name(), reason = %reason, "Ladder gave up");
                            FileResult::Unrecoverable { reason, note }
                        }
                    },
                },
            },
        };
        (path.to_path_buf(), result)
    }

    fn paginate(&self, unit: &InputUnit, accepted: Accepted) -> FileResult {
        let Accepted {
            outcome,
            method,
            score,
            ..
        } = accepted;

        let page_count = outcome.page_count.unwrap_or(outcome.units.len());
        let decision = self.policy.decide(
            page_count,
            unit.size_bytes,
            outcome.total_chars(),
            outcome.used_visual_recognition(),
        );
        info!(
            file = %unit.file_name(),
            method = %method,
            pages = page_count,
            pagination = %decision,
            "Pagination decided"
        );

        let units = self
            .policy
            .apply(&decision, outcome, &unit.file_name(), method, score);
        FileResult::Accepted {
            method,
            score,
            decision: Some(decision),
            units,
        }
    }
}

fn extension_label(path: &Path) -> String {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| "(none)".to_string())
}
