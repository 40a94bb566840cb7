//! Per-run resources and counters.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use docsift_core::{
    output::RUN_LOG_FILE, EscalationEngine, QuarantineManager, RecordWriter, Run, RunLog,
    RunState, ScratchDir, SiftConfig, SiftError, SiftResult,
};

use crate::lock::RunLock;

/// Dispositions tallied while a run is processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub accepted: usize,
    pub quarantined: usize,
    pub deleted: usize,
    pub rows: usize,
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub name: String,
    pub counters: RunCounters,
    pub record_file: Option<PathBuf>,
    pub pruned: Vec<PathBuf>,
}

/// Everything a run owns while it is processed.
///
/// The scratch directory and the run lock are released when the context is
/// dropped, whichever way processing ends.
pub struct RunContext {
    pub config: Arc<SiftConfig>,
    pub run: Run,
    pub engine: EscalationEngine,
    pub quarantine: QuarantineManager,
    pub log: RunLog,
    pub counters: RunCounters,
    record_path: PathBuf,
    records: Option<RecordWriter>,
    // Field order matters: scratch goes before the lock is released.
    scratch: ScratchDir,
    lock: RunLock,
}

impl RunContext {
    /// Take the run lock and set up output, scratch and the run log.
    ///
    /// `single_stem` names the record file after the only eligible document.
    pub fn open(
        config: Arc<SiftConfig>,
        mut run: Run,
        engine: &EscalationEngine,
        single_stem: Option<&str>,
    ) -> SiftResult<Self> {
        let lock = RunLock::acquire(&config.lock_dir(), &run.name)?;
        run.transition(RunState::Processing)?;

        fs::create_dir_all(&run.output_path).map_err(|e| {
            SiftError::Internal(format!(
                "cannot create output directory {}: {}",
                run.output_path.display(),
                e
            ))
        })?;
        let scratch = ScratchDir::create(&config.scratch_root(), &run.name)?;
        run.work_path = Some(scratch.path().to_path_buf());

        let record_path = run
            .output_path
            .join(format!("{}.csv", single_stem.unwrap_or(&run.name)));
        let quarantine = QuarantineManager::new(&run.output_path, &config.review_dir_name);
        let log = RunLog::open(run.output_path.join(RUN_LOG_FILE))?;

        Ok(Self {
            engine: engine.scoped_to(scratch.path()),
            config,
            run,
            quarantine,
            log,
            counters: RunCounters::default(),
            record_path,
            records: None,
            scratch,
            lock,
        })
    }

    pub fn scratch(&self) -> &Path {
        self.scratch.path()
    }

    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    /// The run's record writer, opened on first use.
    pub fn records(&mut self) -> SiftResult<&mut RecordWriter> {
        let writer = match self.records.take() {
            Some(writer) => writer,
            None => RecordWriter::open(
                &self.record_path,
                self.config.replace_output,
                self.config.legacy_csv,
            )?,
        };
        Ok(self.records.insert(writer))
    }

    /// Release scratch and lock, and mark the run complete.
    ///
    /// The row count is taken from the record writer.
    pub fn finish(mut self, pruned: Vec<PathBuf>) -> SiftResult<RunSummary> {
        self.run.transition(RunState::Complete)?;
        let counters = RunCounters {
            rows: self.records.as_ref().map_or(0, RecordWriter::rows_written),
            ..self.counters
        };
        let summary = RunSummary {
            name: self.run.name.clone(),
            counters,
            record_file: self.records.as_ref().map(|w| w.path().to_path_buf()),
            pruned,
        };

        let Self { scratch, lock, .. } = self;
        if let Err(e) = scratch.close() {
            warn!(run = %summary.name, error = %e, "Scratch removal failed");
        }
        debug!(run = %summary.name, lock = %lock.path().display(), "Releasing run lock");
        drop(lock);
        Ok(summary)
    }
}
