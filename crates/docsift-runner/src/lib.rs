//! docsift-runner - Run orchestration for docsift.
//!
//! Watches an input root for run folders, waits until each stops changing
//! (or carries a ready marker), drives every file through its escalation
//! ladder, and leaves behind one record file, a run log and a review folder
//! per run.
//!
//! # Example
//!
//! ```ignore
//! use docsift_core::SiftConfig;
//! use docsift_runner::Orchestrator;
//!
//! let mut orchestrator = Orchestrator::system(SiftConfig::from_env());
//! for summary in orchestrator.run_once().await {
//!     println!("{}: {} rows", summary.name, summary.counters.rows);
//! }
//! ```

pub mod context;
pub mod discovery;
pub mod lock;
pub mod orchestrator;
pub mod processor;
pub mod prune;
pub mod quiescence;

pub use context::{RunContext, RunCounters, RunSummary};
pub use discovery::{discover_runs, list_files, RunCandidate};
pub use lock::RunLock;
pub use orchestrator::Orchestrator;
pub use processor::{FileProcessor, FileResult};
pub use prune::prune_empty_dirs;
pub use quiescence::{QuiescenceTracker, TreeSnapshot};
