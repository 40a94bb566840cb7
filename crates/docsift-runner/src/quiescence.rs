//! Detecting when a run's input tree has stopped changing.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use docsift_core::SiftResult;

/// Size, count and newest modification time of every file in a tree.
///
/// Hidden files are included, since partial uploads are often written under
/// a dotted temporary name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeSnapshot {
    pub files: usize,
    pub bytes: u64,
    pub newest: Option<SystemTime>,
}

impl TreeSnapshot {
    pub fn capture(dir: &Path) -> SiftResult<Self> {
        let mut snapshot = Self::default();
        snapshot.walk(dir)?;
        Ok(snapshot)
    }

    fn walk(&mut self, dir: &Path) -> SiftResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_dir() {
                self.walk(&entry.path())?;
            } else {
                self.files += 1;
                self.bytes += meta.len();
                if let Ok(modified) = meta.modified() {
                    self.newest = Some(self.newest.map_or(modified, |n| n.max(modified)));
                }
            }
        }
        Ok(())
    }
}

/// Last snapshot per run name, compared across polls.
#[derive(Debug, Default)]
pub struct QuiescenceTracker {
    seen: HashMap<String, TreeSnapshot>,
}

impl QuiescenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a snapshot. Returns true when it matches the previous poll.
    pub fn observe(&mut self, run: &str, snapshot: TreeSnapshot) -> bool {
        match self.seen.insert(run.to_string(), snapshot) {
            Some(previous) => previous == snapshot,
            None => false,
        }
    }

    /// Drop state for a run that was processed or disappeared.
    pub fn forget(&mut self, run: &str) {
        self.seen.remove(run);
    }

    /// Drop state for runs not in `present`.
    pub fn retain(&mut self, present: &[String]) {
        self.seen.retain(|name, _| present.contains(name));
    }
}

/// Whether the explicit ready marker exists at the top of the run.
pub fn ready_marker_present(run_dir: &Path, marker: &str) -> bool {
    !marker.is_empty() && run_dir.join(marker).is_file()
}
