//! Pass escalation engine.
//!
//! A [`Ladder`] is an ordered list of [`Rung`]s, each pairing an
//! [`ExtractionPass`] with an acceptance cutoff. The engine tries rungs in
//! order and accepts the first outcome whose aggregate score clears its
//! cutoff. Low scores, timeouts and capability errors all fall through to the
//! next rung; only a scratch-space shortage stops the ladder early.
//!
//! Every rung gets a private scratch directory that is removed when the rung
//! returns, whatever the result.

mod space;

pub use space::{FixedSpaceGauge, FsSpaceGauge, SpaceGauge};

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::scoring::AggregateMode;
use crate::traits::CapabilityError;
use crate::types::{Category, InputUnit, Method, PassOutcome, ReasonCode};

/// Per-attempt context handed to a pass.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// Private scratch directory, removed after the attempt.
    pub scratch: &'a Path,
    /// Cutoff the outcome will be judged against.
    pub cutoff: f64,
}

/// A pass that could not produce an outcome at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassFailure {
    pub reason: ReasonCode,
    pub message: String,
}

impl PassFailure {
    pub fn new(reason: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for PassFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.message)
    }
}

impl From<CapabilityError> for PassFailure {
    fn from(err: CapabilityError) -> Self {
        Self::new(err.reason(), err.to_string())
    }
}

/// One extraction method wrapped as a ladder step.
#[async_trait]
pub trait ExtractionPass: Send + Sync {
    /// Method tag carried by units this pass produces.
    fn method(&self) -> Method;

    /// Whether the pass runs visual recognition (and so needs scratch space).
    fn uses_visual_recognition(&self) -> bool {
        self.method().uses_visual_recognition()
    }

    /// Run the pass over one input.
    async fn attempt(
        &self,
        unit: &InputUnit,
        ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure>;
}

/// A pass with its acceptance cutoff.
#[derive(Clone)]
pub struct Rung {
    pub pass: Arc<dyn ExtractionPass>,
    pub cutoff: f64,
}

impl Rung {
    pub fn new(pass: Arc<dyn ExtractionPass>, cutoff: f64) -> Self {
        Self { pass, cutoff }
    }
}

impl fmt::Debug for Rung {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rung")
            .field("method", &self.pass.method())
            .field("cutoff", &self.cutoff)
            .finish()
    }
}

/// Ordered rungs for one input category.
#[derive(Debug, Clone, Default)]
pub struct Ladder {
    rungs: Vec<Rung>,
}

impl Ladder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rung.
    pub fn rung(mut self, pass: Arc<dyn ExtractionPass>, cutoff: f64) -> Self {
        self.rungs.push(Rung::new(pass, cutoff));
        self
    }

    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }
}

/// Ladders keyed by input category.
#[derive(Debug, Clone, Default)]
pub struct LadderSet {
    ladders: HashMap<Category, Ladder>,
}

impl LadderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, category: Category, ladder: Ladder) -> Self {
        self.ladders.insert(category, ladder);
        self
    }

    pub fn insert(&mut self, category: Category, ladder: Ladder) {
        self.ladders.insert(category, ladder);
    }

    pub fn get(&self, category: Category) -> Option<&Ladder> {
        self.ladders.get(&category)
    }
}

/// What happened on one rung.
#[derive(Debug, Clone, PartialEq)]
pub enum RungResult {
    Accepted { score: f64 },
    Rejected { score: f64 },
    Failed { reason: ReasonCode, message: String },
}

/// Audit entry for one attempted rung.
#[derive(Debug, Clone, PartialEq)]
pub struct RungReport {
    pub method: Method,
    pub cutoff: f64,
    pub result: RungResult,
}

impl fmt::Display for RungReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            RungResult::Accepted { score } => {
                write!(f, "{} {:.2}>={:.2}", self.method, score, self.cutoff)
            }
            RungResult::Rejected { score } => {
                write!(f, "{} {:.2}<{:.2}", self.method, score, self.cutoff)
            }
            RungResult::Failed { reason, message } => {
                write!(f, "{} {} ({})", self.method, reason, message)
            }
        }
    }
}

/// A ladder that produced an acceptable outcome.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub outcome: PassOutcome,
    pub method: Method,
    pub score: f64,
    pub cutoff: f64,
    /// 0-based index of the accepting rung.
    pub rung: usize,
    pub reports: Vec<RungReport>,
}

/// A ladder that gave up on the input.
#[derive(Debug, Clone)]
pub struct Unrecoverable {
    pub reason: ReasonCode,
    pub note: String,
    pub reports: Vec<RungReport>,
}

impl Unrecoverable {
    fn from_reports(reports: Vec<RungReport>) -> Self {
        let reason = reports
            .iter()
            .filter_map(|r| match &r.result {
                RungResult::Failed { reason, .. } => Some(*reason),
                _ => None,
            })
            .max_by_key(ReasonCode::severity)
            .unwrap_or(ReasonCode::PassExhausted);
        let note = if reports.is_empty() {
            "no extraction pass configured".to_string()
        } else {
            summarize(&reports)
        };
        Self {
            reason,
            note,
            reports,
        }
    }
}

fn summarize(reports: &[RungReport]) -> String {
    reports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Runs ladders against inputs.
#[derive(Clone)]
pub struct EscalationEngine {
    scratch_root: PathBuf,
    space: Arc<dyn SpaceGauge>,
    min_free_bytes: u64,
    timeout: Duration,
    aggregate: AggregateMode,
}

impl fmt::Debug for EscalationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EscalationEngine")
            .field("scratch_root", &self.scratch_root)
            .field("min_free_bytes", &self.min_free_bytes)
            .field("timeout", &self.timeout)
            .field("aggregate", &self.aggregate)
            .finish()
    }
}

impl EscalationEngine {
    /// Create an engine writing rung scratch under `scratch_root`.
    pub fn new(scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            space: Arc::new(FsSpaceGauge),
            min_free_bytes: 1_000_000_000,
            timeout: Duration::from_secs(300),
            aggregate: AggregateMode::Median,
        }
    }

    pub fn with_space_gauge(mut self, gauge: Arc<dyn SpaceGauge>) -> Self {
        self.space = gauge;
        self
    }

    pub fn with_min_free_bytes(mut self, bytes: u64) -> Self {
        self.min_free_bytes = bytes;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_aggregate(mut self, mode: AggregateMode) -> Self {
        self.aggregate = mode;
        self
    }

    /// Same settings, different scratch root. Used for nested ladders.
    pub fn scoped_to(&self, scratch_root: impl Into<PathBuf>) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            ..self.clone()
        }
    }

    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    pub fn aggregate_mode(&self) -> AggregateMode {
        self.aggregate
    }

    /// Walk `ladder` for `unit`.
    pub async fn escalate(
        &self,
        unit: &InputUnit,
        ladder: &Ladder,
    ) -> Result<Accepted, Unrecoverable> {
        let file = unit.file_name();
        let mut reports = Vec::with_capacity(ladder.len());

        for (idx, rung) in ladder.rungs().iter().enumerate() {
            let method = rung.pass.method();

            if rung.pass.uses_visual_recognition() {
                if let Some(note) = self.space_shortage() {
                    warn!(file = %file, method = %method, "{}", note);
                    reports.push(RungReport {
                        method,
                        cutoff: rung.cutoff,
                        result: RungResult::Failed {
                            reason: ReasonCode::LowScratchSpace,
                            message: note.clone(),
                        },
                    });
                    return Err(Unrecoverable {
                        reason: ReasonCode::LowScratchSpace,
                        note,
                        reports,
                    });
                }
            }

            let result = self.run_rung(unit, rung).await;
            let report = RungReport {
                method,
                cutoff: rung.cutoff,
                result: result.as_ref().map_or_else(
                    |f| RungResult::Failed {
                        reason: f.reason,
                        message: f.message.clone(),
                    },
                    |(_, score)| {
                        if *score >= rung.cutoff {
                            RungResult::Accepted { score: *score }
                        } else {
                            RungResult::Rejected { score: *score }
                        }
                    },
                ),
            };
            reports.push(report);

            match result {
                Ok((outcome, score)) if score >= rung.cutoff => {
                    info!(
                        file = %file,
                        method = %method,
                        score = %format!("{:.2}", score),
                        cutoff = rung.cutoff,
                        share_reliable = %format!("{:.0}", outcome.share_reliable()),
                        "Rung accepted"
                    );
                    return Ok(Accepted {
                        outcome,
                        method,
                        score,
                        cutoff: rung.cutoff,
                        rung: idx,
                        reports,
                    });
                }
                Ok((_, score)) => {
                    debug!(
                        file = %file,
                        method = %method,
                        score = %format!("{:.2}", score),
                        cutoff = rung.cutoff,
                        "Rung below cutoff, escalating"
                    );
                }
                Err(failure) => {
                    warn!(file = %file, method = %method, reason = %failure.reason, "Rung failed: {}", failure.message);
                    if failure.reason.aborts_ladder() {
                        return Err(Unrecoverable {
                            reason: failure.reason,
                            note: summarize(&reports),
                            reports,
                        });
                    }
                }
            }
        }

        Err(Unrecoverable::from_reports(reports))
    }

    async fn run_rung(
        &self,
        unit: &InputUnit,
        rung: &Rung,
    ) -> Result<(PassOutcome, f64), PassFailure> {
        let scratch = tempfile::Builder::new()
            .prefix("pass-")
            .tempdir_in(&self.scratch_root)
            .map_err(|e| {
                PassFailure::new(
                    ReasonCode::CapabilityUnavailable,
                    format!("cannot create scratch under {}: {}", self.scratch_root.display(), e),
                )
            })?;

        let ctx = PassContext {
            scratch: scratch.path(),
            cutoff: rung.cutoff,
        };
        let attempt = tokio::time::timeout(self.timeout, rung.pass.attempt(unit, ctx)).await;

        // Scratch goes away here on every path.
        drop(scratch);

        match attempt {
            Ok(Ok(outcome)) => {
                let score = outcome.aggregate(self.aggregate);
                Ok((outcome, score))
            }
            Ok(Err(failure)) => Err(failure),
            Err(_) => Err(PassFailure::new(
                ReasonCode::Timeout,
                format!("exceeded {}s", self.timeout.as_secs()),
            )),
        }
    }

    fn space_shortage(&self) -> Option<String> {
        match self.space.available_bytes(&self.scratch_root) {
            Ok(free) if free < self.min_free_bytes => Some(format!(
                "scratch free space {} bytes below floor {} bytes",
                free, self.min_free_bytes
            )),
            Ok(_) => None,
            Err(e) => {
                warn!(
                    path = %self.scratch_root.display(),
                    error = %e,
                    "Free-space check failed, continuing"
                );
                None
            }
        }
    }
}
