//! docsift-core - Core library for docsift.
//!
//! This crate provides the domain types, the reliability scorer, the pass
//! escalation engine, the pagination policy, quarantine bookkeeping and the
//! per-run output writers. Concrete extraction passes live in
//! `docsift-extractors`; run orchestration lives in `docsift-runner`.
//!
//! # Example
//!
//! ```ignore
//! use docsift_core::{EscalationEngine, InputUnit, Ladder, Category};
//!
//! let engine = EscalationEngine::new("/data/work/scratch");
//! let unit = InputUnit::from_path("/data/input/batch/report.pdf", Category::Paginated)?;
//! match engine.escalate(&unit, &ladder).await {
//!     Ok(accepted) => println!("accepted via {}", accepted.method),
//!     Err(failed) => println!("quarantine: {}", failed.reason),
//! }
//! ```

pub mod config;
pub mod error;
pub mod escalation;
pub mod output;
pub mod pagination;
pub mod quarantine;
pub mod scoring;
pub mod scratch;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{Cutoffs, LargeDocThresholds, SiftConfig};
pub use error::{ErrorCode, SiftError, SiftResult};
pub use escalation::{
    Accepted, EscalationEngine, ExtractionPass, FixedSpaceGauge, FsSpaceGauge, Ladder, LadderSet,
    PassContext, PassFailure, Rung, RungReport, RungResult, SpaceGauge, Unrecoverable,
};
pub use output::{Disposition, RecordLayout, RecordWriter, RunLog};
pub use pagination::{PaginationDecision, PaginationMode, PaginationPolicy, PaginationTrigger};
pub use quarantine::{QuarantineManager, QuarantineRecord};
pub use scoring::{AggregateMode, ReliabilityScorer};
pub use scratch::ScratchDir;
pub use traits::{
    CapabilityError, CapabilityResult, ColorMode, EmbeddedImage, LayoutMode, LegacyExtractor,
    OcrEngine, OcrRequest, OfficeExtractor, Rasterizer, Rotation, TextLayerExtractor,
};
pub use types::{
    Category, FileClass, InputUnit, Method, PageRef, PassOutcome, ReasonCode, Reliability, Run,
    RunState, TextUnit,
};
