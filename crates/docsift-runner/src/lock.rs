//! Exclusive per-run lock files.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use docsift_core::{ErrorCode, SiftError, SiftResult};

/// Held for the whole time a run is processed; released on drop.
#[derive(Debug)]
pub struct RunLock {
    file: File,
    path: PathBuf,
}

impl RunLock {
    /// Take `<lock_dir>/<run>.lock` without waiting.
    pub fn acquire(lock_dir: &Path, run: &str) -> SiftResult<Self> {
        fs::create_dir_all(lock_dir).map_err(|e| create_failed(lock_dir, e))?;
        let path = lock_dir.join(format!("{}.lock", run));
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| create_failed(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!(run, path = %path.display(), "Run lock acquired");
                Ok(Self { file, path })
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Err(SiftError::lock_held(run)),
            Err(e) => Err(create_failed(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %e, "Could not release run lock");
        }
    }
}

fn create_failed(path: &Path, err: std::io::Error) -> SiftError {
    SiftError::RunLock {
        message: format!("cannot create lock {}: {}", path.display(), err),
        code: ErrorCode::LockCreateFailed,
    }
}
