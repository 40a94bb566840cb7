//! Run-scoped scratch directories.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::{SiftError, SiftResult};

const RUN_PREFIX: &str = "run-";

/// Scratch directory owned by one run. Removed on drop, on every exit path.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create `<root>/run-<name>-XXXX`.
    pub fn create(root: &Path, run_name: &str) -> SiftResult<Self> {
        fs::create_dir_all(root)
            .map_err(|e| SiftError::scratch(format!("cannot create {}", root.display()), e))?;
        let prefix = format!("{}{}-", RUN_PREFIX, sanitize(run_name));
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(root)
            .map_err(|e| SiftError::scratch(format!("cannot create scratch under {}", root.display()), e))?;
        debug!(path = %dir.path().display(), "Created run scratch");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove now, reporting failure instead of ignoring it.
    pub fn close(self) -> SiftResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| SiftError::scratch(format!("cannot remove {}", path.display()), e))
    }
}

/// Remove leftover run scratch directories from an earlier process.
pub fn sweep_stale(root: &Path) -> SiftResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut removed = Vec::new();
    for entry in entries {
        let entry = entry?;
        let stale = entry.file_name().to_string_lossy().starts_with(RUN_PREFIX)
            && entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !stale {
            continue;
        }
        match fs::remove_dir_all(entry.path()) {
            Ok(()) => removed.push(entry.path()),
            Err(e) => warn!(path = %entry.path().display(), error = %e, "Could not remove stale scratch"),
        }
    }
    Ok(removed)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let path = {
            let scratch = ScratchDir::create(root.path(), "batch 7").unwrap();
            fs::write(scratch.path().join("page.png"), b"x").unwrap();
            assert!(scratch
                .path()
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("run-batch_7-"));
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_removed_on_panic() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();
        let result = std::panic::catch_unwind(move || {
            let _scratch = ScratchDir::create(&root_path, "boom").unwrap();
            panic!("mid-run failure");
        });
        assert!(result.is_err());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_sweep_only_touches_run_dirs() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("run-old-abc")).unwrap();
        fs::write(root.path().join("run-old-abc/x"), b"x").unwrap();
        fs::create_dir(root.path().join("keep")).unwrap();
        fs::write(root.path().join("run-file"), b"x").unwrap();

        let removed = sweep_stale(root.path()).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(root.path().join("keep").exists());
        assert!(root.path().join("run-file").exists());
    }

    #[test]
    fn test_sweep_missing_root() {
        assert!(sweep_stale(Path::new("/no/such/scratch")).unwrap().is_empty());
    }
}
