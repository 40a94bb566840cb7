//! Free-space measurement for the scratch guardrail.

use std::path::Path;

/// Reports free bytes on the filesystem holding a path.
pub trait SpaceGauge: Send + Sync {
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64>;
}

/// Gauge backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSpaceGauge;

impl SpaceGauge for FsSpaceGauge {
    fn available_bytes(&self, path: &Path) -> std::io::Result<u64> {
        fs2::available_space(path)
    }
}

/// Gauge that always reports the same figure.
#[derive(Debug, Clone, Copy)]
pub struct FixedSpaceGauge(pub u64);

impl SpaceGauge for FixedSpaceGauge {
    fn available_bytes(&self, _path: &Path) -> std::io::Result<u64> {
        Ok(self.0)
    }
}
