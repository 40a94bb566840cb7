//! Page rasterization with poppler's `pdftoppm` and `pdfinfo`.

use async_trait::async_trait;
use docsift_core::{CapabilityResult, ColorMode, Rasterizer};
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::ExtractError;
use crate::tools::{command_available, run_tool};

/// Rasterizer backed by the poppler command-line tools.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    pdftoppm: String,
    pdfinfo: String,
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self {
            pdftoppm: "pdftoppm".to_string(),
            pdfinfo: "pdfinfo".to_string(),
        }
    }
}

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Pull the `Pages:` count out of `pdfinfo` output.
pub(crate) fn parse_page_count(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|count| count.parse().ok())
}

#[async_trait]
impl Rasterizer for PdftoppmRasterizer {
    async fn page_count(&self, document: &Path) -> CapabilityResult<usize> {
        let mut cmd = Command::new(&self.pdfinfo);
        cmd.arg(document);
        let output = run_tool("pdfinfo", &mut cmd).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_page_count(&stdout).ok_or_else(|| {
            ExtractError::BadOutput {
                tool: "pdfinfo".to_string(),
                message: "no Pages: line".to_string(),
            }
            .into()
        })
    }

    async fn rasterize(
        &self,
        document: &Path,
        page: usize,
        dpi: u32,
        color: ColorMode,
        out_dir: &Path,
    ) -> CapabilityResult<PathBuf> {
        let prefix = out_dir.join(format!("page-{:05}-{}", page, dpi));
        let mut cmd = Command::new(&self.pdftoppm);
        cmd.arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-png");
        if color == ColorMode::Grayscale {
            cmd.arg("-gray");
        }
        cmd.arg("-singlefile").arg(document).arg(&prefix);
        run_tool("pdftoppm", &mut cmd).await?;

        let image = prefix.with_extension("png");
        if !image.is_file() {
            return Err(ExtractError::BadOutput {
                tool: "pdftoppm".to_string(),
                message: format!("expected {}", image.display()),
            }
            .into());
        }
        Ok(image)
    }

    fn is_available(&self) -> bool {
        command_available(&self.pdftoppm)
    }
}
