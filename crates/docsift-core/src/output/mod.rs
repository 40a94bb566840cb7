//! Per-run output files.

mod records;
mod run_log;
mod sidecar;

pub use records::{RecordLayout, RecordWriter, LEGACY_HEADER, STANDARD_HEADER};
pub use run_log::{Disposition, RunLog, RUN_LOG_FILE};
pub use sidecar::write_sidecar;
