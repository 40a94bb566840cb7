//! Run lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use strum::{Display, IntoStaticStr};

use crate::error::{SiftError, SiftResult};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunState {
    /// Seen under the input root, nothing observed yet.
    Discovered,
    /// Waiting for the input tree to stop changing.
    QuiescentWait,
    /// Owned by the orchestrator and being processed.
    Processing,
    /// Processing finished.
    Complete,
}

impl RunState {
    fn can_advance_to(self, next: RunState) -> bool {
        matches!(
            (self, next),
            (RunState::Discovered, RunState::QuiescentWait)
                | (RunState::Discovered, RunState::Processing)
                | (RunState::QuiescentWait, RunState::QuiescentWait)
                | (RunState::QuiescentWait, RunState::Processing)
                | (RunState::Processing, RunState::Complete)
        )
    }
}

/// A named batch of inputs.
#[derive(Debug, Clone)]
pub struct Run {
    /// Run name (top-level folder name).
    pub name: String,
    /// Input directory of the run.
    pub input_path: PathBuf,
    /// Output directory of the run.
    pub output_path: PathBuf,
    /// Scratch root for the run, set once processing starts.
    pub work_path: Option<PathBuf>,
    /// First time the orchestrator observed the run.
    pub first_seen: DateTime<Utc>,
    state: RunState,
}

impl Run {
    /// Create a freshly discovered run.
    pub fn new(name: impl Into<String>, input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            name: name.into(),
            input_path,
            output_path,
            work_path: None,
            first_seen: Utc::now(),
            state: RunState::Discovered,
        }
    }

    /// Current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Move to the next lifecycle state. States only move forward.
    pub fn transition(&mut self, next: RunState) -> SiftResult<()> {
        if !self.state.can_advance_to(next) {
            return Err(SiftError::InvalidTransition {
                run: self.name.clone(),
                from: self.state.to_string(),
                to: next.to_string(),
            });
        }
        self.state = next;
        Ok(())
    }
}
