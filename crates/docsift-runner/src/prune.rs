//! Removal of empty directories left behind by a processed run.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use docsift_core::{SiftError, SiftResult};

/// Remove empty directories under `run_dir`, deepest first.
///
/// `run_dir` itself goes too once it is empty, but nothing above it is ever
/// touched, and a `run_dir` that is not strictly inside `input_root` is
/// refused outright.
pub fn prune_empty_dirs(run_dir: &Path, input_root: &Path) -> SiftResult<Vec<PathBuf>> {
    let root = input_root.canonicalize()?;
    let run = run_dir.canonicalize()?;
    if run == root || !run.starts_with(&root) {
        return Err(SiftError::PruneBoundary {
            path: run,
            message: format!("not strictly inside input root {}", root.display()),
        });
    }

    let mut removed = Vec::new();
    prune(&run, &mut removed)?;
    Ok(removed)
}

/// Returns whether `dir` was removed.
fn prune(dir: &Path, removed: &mut Vec<PathBuf>) -> SiftResult<bool> {
    let mut empty = true;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        // Symlinked directories are left alone, never followed.
        if entry.file_type()?.is_dir() {
            if !prune(&path, removed)? {
                empty = false;
            }
        } else {
            empty = false;
        }
    }

    if !empty {
        return Ok(false);
    }
    match fs::remove_dir(dir) {
        Ok(()) => {
            debug!(path = %dir.display(), "Pruned empty directory");
            removed.push(dir.to_path_buf());
            Ok(true)
        }
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Directory not pruned");
            Ok(false)
        }
    }
}
