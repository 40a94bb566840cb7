//! The polling loop: discover runs, wait for quiescence, process, clean up.

use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use docsift_core::{
    output::write_sidecar, Disposition, EscalationEngine, FileClass, FsSpaceGauge, Run, RunState,
    SiftConfig, SiftResult, SpaceGauge,
};
use docsift_extractors::{Capabilities, LadderFactory};

use crate::context::{RunContext, RunSummary};
use crate::discovery::{discover_runs, list_files, RunCandidate};
use crate::processor::{FileProcessor, FileResult};
use crate::prune::prune_empty_dirs;
use crate::quiescence::{ready_marker_present, QuiescenceTracker, TreeSnapshot};

/// Owns every run from discovery until it is complete.
pub struct Orchestrator {
    config: Arc<SiftConfig>,
    engine: EscalationEngine,
    processor: FileProcessor,
    tracker: QuiescenceTracker,
    runs: HashMap<String, Run>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Orchestrator {
    /// Orchestrator over the given capabilities and free-space gauge.
    pub fn new(config: SiftConfig, caps: &Capabilities, space: Arc<dyn SpaceGauge>) -> Self {
        let config = Arc::new(config);
        let engine = EscalationEngine::new(config.scratch_root())
            .with_space_gauge(space)
            .with_min_free_bytes(config.min_free_bytes)
            .with_timeout(config.pass_timeout())
            .with_aggregate(config.aggregate);
        let ladders = LadderFactory::build(&config, caps, &engine);

        Self {
            processor: FileProcessor::new(config.clone(), ladders),
            config,
            engine,
            tracker: QuiescenceTracker::new(),
            runs: HashMap::new(),
            shutdown: None,
        }
    }

    /// Orchestrator over the installed tools and the real filesystem.
    pub fn system(config: SiftConfig) -> Self {
        Self::new(config, &Capabilities::system(), Arc::new(FsSpaceGauge))
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Poll until `shutdown` flips to true. Shutdown is honored between runs.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        self.shutdown = Some(shutdown.clone());
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(
            input = %self.config.input_dir.display(),
            interval_secs = self.config.poll_interval_secs,
            "Polling loop started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let summaries = self.sweep().await;
                    debug!(completed = summaries.len(), "Sweep finished");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
            if *shutdown.borrow() {
                break;
            }
        }
        info!("Polling loop stopped");
    }

    /// Process whatever becomes ready over two consecutive polls, then return.
    pub async fn run_once(&mut self) -> Vec<RunSummary> {
        let mut summaries = self.sweep().await;
        if self.runs.is_empty() {
            return summaries;
        }
        tokio::time::sleep(self.config.poll_interval()).await;
        summaries.extend(self.sweep().await);
        summaries
    }

    /// One polling pass over the input root.
    ///
    /// Runs with a ready marker, or whose tree did not change since the last
    /// pass, are processed one after another. A failing run is logged and
    /// the pass moves on.
    pub async fn sweep(&mut self) -> Vec<RunSummary> {
        let candidates = match discover_runs(&self.config.input_dir, &self.config.review_dir_name) {
            Ok(c) => c,
            Err(e) => {
                error!(input = %self.config.input_dir.display(), error = %e, "Run discovery failed");
                return Vec::new();
            }
        };

        let names: Vec<String> = candidates.iter().map(|c| c.name.clone()).collect();
        self.tracker.retain(&names);
        self.runs.retain(|name, _| names.contains(name));

        let mut summaries = Vec::new();
        for candidate in candidates {
            if self.stopping() {
                info!("Shutdown requested, leaving remaining runs for the next start");
                break;
            }
            if !self.is_ready(&candidate) {
                continue;
            }
            let Some(run) = self.runs.remove(&candidate.name) else {
                continue;
            };
            self.tracker.forget(&candidate.name);

            match self.process_run(run).await {
                Ok(Some(summary)) => summaries.push(summary),
                Ok(None) => {}
                Err(e) if e.is_lock_held() => {
                    warn!(
                        run = %candidate.name,
                        code = e.code().as_str(),
                        error = %e,
                        "Run is locked by another worker, skipping"
                    );
                }
                Err(e) => {
                    error!(run = %candidate.name, code = e.code().as_str(), error = %e, "Run failed");
                }
            }
        }
        summaries
    }

    fn stopping(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn is_ready(&mut self, candidate: &RunCandidate) -> bool {
        let output = self.config.output_dir.join(&candidate.name);
        let run = self
            .runs
            .entry(candidate.name.clone())
            .or_insert_with(|| Run::new(&candidate.name, candidate.path.clone(), output));

        if ready_marker_present(&candidate.path, &self.config.ready_marker) {
            debug!(run = %candidate.name, "Ready marker present");
            return true;
        }

        let snapshot = match TreeSnapshot::capture(&candidate.path) {
            Ok(s) => s,
            Err(e) => {
                warn!(run = %candidate.name, error = %e, "Cannot inspect run tree");
                return false;
            }
        };
        if self.tracker.observe(&candidate.name, snapshot) {
            return true;
        }
        if let Err(e) = run.transition(RunState::QuiescentWait) {
            debug!(run = %candidate.name, error = %e, "State unchanged");
        }
        false
    }

    /// Process every file of one run. `Ok(None)` means there was nothing to do.
    pub async fn process_run(&self, run: Run) -> SiftResult<Option<RunSummary>> {
        let config = self.config.clone();
        let files = list_files(&run.input_path, &config.review_dir_name, &config.ready_marker)?;
        if files.is_empty() {
            debug!(run = %run.name, "Run has no files yet");
            return Ok(None);
        }

        let eligible: Vec<&PathBuf> = files
            .iter()
            .filter(|f| matches!(config.classify(f), FileClass::Extract(_)))
            .collect();
        let single_stem = match eligible.as_slice() {
            [only] => only.file_stem().map(|s| s.to_string_lossy().into_owned()),
            _ => None,
        };

        let input_path = run.input_path.clone();
        let mut ctx = RunContext::open(config.clone(), run, &self.engine, single_stem.as_deref())?;
        info!(run = %ctx.run.name, files = files.len(), scratch = %ctx.scratch().display(), "Run started");
        ctx.log.started(&ctx.run.name, files.len())?;

        let engine = ctx.engine.clone();
        let processor = &self.processor;
        let workers = config.workers.max(1);
        let mut results = stream::iter(files.iter())
            .map(|path| {
                let engine = &engine;
                async move { processor.process(engine, path).await }
            })
            .buffered(workers);

        while let Some((path, result)) = results.next().await {
            dispose(&mut ctx, &input_path, &path, result).await;
        }
        drop(results);

        let c = ctx.counters;
        ctx.log.finished(&ctx.run.name, c.accepted, c.quarantined, c.deleted)?;

        let marker = input_path.join(&config.ready_marker);
        if !config.ready_marker.is_empty() && marker.is_file() {
            if let Err(e) = tokio::fs::remove_file(&marker).await {
                warn!(run = %ctx.run.name, error = %e, "Cannot remove ready marker");
            }
        }

        let pruned = match prune_empty_dirs(&input_path, &config.input_dir) {
            Ok(p) => p,
            Err(e) => {
                error!(run = %ctx.run.name, error = %e, "Pruning refused");
                Vec::new()
            }
        };

        let summary = ctx.finish(pruned)?;
        info!(
            run = %summary.name,
            accepted = c.accepted,
            quarantined = c.quarantined,
            deleted = c.deleted,
            rows = summary.counters.rows,
            "Run complete"
        );
        Ok(Some(summary))
    }
}

/// Apply one file's outcome. Failures here never stop the run.
async fn dispose(ctx: &mut RunContext, run_input: &Path, path: &Path, result: FileResult) {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let disposition = match result {
        FileResult::Accepted {
            method,
            score,
            decision,
            units,
        } => {
            let rows = match ctx.records().and_then(|w| w.write_units(&units)) {
                Ok(()) => units.len(),
                Err(e) => {
                    error!(run = %ctx.run.name, file = %file, error = %e, "Record write failed, keeping input");
                    let _ = ctx.log.line(format_args!("{} record write failed: {}", file, e));
                    return;
                }
            };
            if ctx.config.text_sidecars {
                let relative = path.strip_prefix(run_input).unwrap_or(path);
                if let Err(e) = write_sidecar(&ctx.run.output_path, relative, method, score, &units) {
                    warn!(run = %ctx.run.name, file = %file, error = %e, "Sidecar write failed");
                }
            }
            ctx.counters.accepted += 1;
            Disposition::Accepted {
                method,
                score,
                rows,
                pagination: decision.map(|d| d.to_string()),
            }
        }
        FileResult::Unrecoverable { reason, note } => {
            if let Err(e) = ctx.quarantine.quarantine(path, reason, &note) {
                error!(run = %ctx.run.name, file = %file, error = %e, "Quarantine failed");
                let _ = ctx.log.line(format_args!("{} quarantine failed: {}", file, e));
                return;
            }
            ctx.counters.quarantined += 1;
            Disposition::Quarantined { reason, note }
        }
        FileResult::AutoDelete => {
            if let Err(e) = tokio::fs::remove_file(path).await {
                warn!(run = %ctx.run.name, file = %file, error = %e, "Cannot delete auto-delete input");
                return;
            }
            info!(run = %ctx.run.name, file = %file, "Deleted auto-delete input");
            ctx.counters.deleted += 1;
            Disposition::AutoDeleted
        }
    };

    if let Err(e) = ctx.log.disposition(&file, &disposition) {
        warn!(run = %ctx.run.name, file = %file, error = %e, "Run log write failed");
    }

    if disposition.is_accepted() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            // The next pass over this run would append the same rows again.
            error!(run = %ctx.run.name, file = %file, error = %e, "Rows written but input not deleted");
            let _ = ctx
                .log
                .line(format_args!("{} rows written but input not deleted: {}", file, e));
        }
    }
}
