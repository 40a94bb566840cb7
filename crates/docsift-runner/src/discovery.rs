//! Run discovery and file listing under the input root.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use docsift_core::{SiftError, SiftResult};

/// A top-level folder under the input root that may become a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunCandidate {
    pub name: String,
    pub path: PathBuf,
}

/// Whether a path's final component starts with a dot.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Candidate runs under `input_root`, sorted by name.
///
/// A bare file directly under the root is moved into a new folder named
/// after its stem, which becomes a single-file run. A file that cannot be
/// wrapped is logged and left in place; it does not hide the other runs.
pub fn discover_runs(input_root: &Path, review_dir_name: &str) -> SiftResult<Vec<RunCandidate>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(input_root)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| !is_hidden(p))
        .filter(|p| p.file_name().map_or(true, |n| n != review_dir_name))
        .collect();
    entries.sort();

    let mut runs = Vec::new();
    for path in entries {
        if path.is_dir() {
            runs.push(RunCandidate {
                name: dir_name(&path),
                path,
            });
        } else if path.is_file() {
            match wrap_bare_file(input_root, &path) {
                Ok(run) => runs.push(run),
                Err(e) => {
                    warn!(
                        file = %path.display(),
                        code = e.code().as_str(),
                        error = %e,
                        "Could not wrap bare file into a run, leaving it in place"
                    );
                    continue;
                }
            }
        }
    }
    runs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(runs)
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn wrap_bare_file(input_root: &Path, file: &Path) -> SiftResult<RunCandidate> {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SiftError::Internal(format!("cannot name a run for {}", file.display())))?;

    let mut folder = input_root.join(&stem);
    if folder.exists() {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S").to_string();
        folder = input_root.join(format!("{}_{}", stem, stamp));
        let mut n = 1;
        while folder.exists() {
            folder = input_root.join(format!("{}_{}_{}", stem, stamp, n));
            n += 1;
        }
    }

    fs::create_dir(&folder)?;
    let file_name = file
        .file_name()
        .ok_or_else(|| SiftError::Internal(format!("{} has no file name", file.display())))?;
    fs::rename(file, folder.join(file_name))?;
    info!(file = %file.display(), run = %folder.display(), "Wrapped bare file into a run");

    Ok(RunCandidate {
        name: dir_name(&folder),
        path: folder,
    })
}

/// Files of a run in processing order.
///
/// Within each directory, files come first (sorted by name), then
/// subdirectories in name order. Hidden entries, the review directory and
/// the ready marker are skipped.
pub fn list_files(run_dir: &Path, review_dir_name: &str, ready_marker: &str) -> SiftResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect(run_dir, review_dir_name, &mut files)?;
    let marker = run_dir.join(ready_marker);
    files.retain(|f| *f != marker);
    Ok(files)
}

fn collect(dir: &Path, review_dir_name: &str, out: &mut Vec<PathBuf>) -> SiftResult<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| !is_hidden(p))
        .collect();
    entries.sort();

    let (dirs, files): (Vec<PathBuf>, Vec<PathBuf>) = entries.into_iter().partition(|p| p.is_dir());
    out.extend(files.into_iter().filter(|p| p.is_file()));
    for sub in dirs {
        if sub.file_name().map_or(false, |n| n == review_dir_name) {
            continue;
        }
        collect(&sub, review_dir_name, out)?;
    }
    Ok(())
}
