//! Legacy word-processor text via `antiword`, falling back to `catdoc`.

use async_trait::async_trait;
use docsift_core::{CapabilityError, CapabilityResult, LegacyExtractor};
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::tools::run_tool;

/// Reader that shells out to antiword, then catdoc.
#[derive(Debug, Clone)]
pub struct AntiwordReader {
    antiword: String,
    catdoc: String,
}

impl Default for AntiwordReader {
    fn default() -> Self {
        Self {
            antiword: "antiword".to_string(),
            catdoc: "catdoc".to_string(),
        }
    }
}

impl AntiwordReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the tool binaries.
    pub fn with_tools(antiword: impl Into<String>, catdoc: impl Into<String>) -> Self {
        Self {
            antiword: antiword.into(),
            catdoc: catdoc.into(),
        }
    }

    async fn antiword(&self, document: &Path) -> ExtractResult<String> {
        let mut cmd = Command::new(&self.antiword);
        cmd.arg("-m").arg("UTF-8.txt").arg(document);
        let output = run_tool("antiword", &mut cmd).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn catdoc(&self, document: &Path) -> ExtractResult<String> {
        let mut cmd = Command::new(&self.catdoc);
        cmd.arg("-dutf-8").arg("-w").arg(document);
        let output = run_tool("catdoc", &mut cmd).await?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl LegacyExtractor for AntiwordReader {
    async fn text(&self, document: &Path) -> CapabilityResult<String> {
        let first = match self.antiword(document).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => {
                debug!(file = %document.display(), "antiword produced no text, trying catdoc");
                None
            }
            Err(ExtractError::ToolMissing(_)) => {
                debug!("antiword not installed, trying catdoc");
                None
            }
            Err(e) => {
                warn!(file = %document.display(), error = %e, "antiword failed, trying catdoc");
                Some(e)
            }
        };

        match self.catdoc(document).await {
            Ok(text) => Ok(text),
            // Report the antiword failure when catdoc is not an option.
            Err(ExtractError::ToolMissing(_)) => match first {
                Some(e) => Err(e.into()),
                None => Err(CapabilityError::unavailable(
                    "antiword/catdoc",
                    "neither legacy reader is installed",
                )),
            },
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::ReasonCode;

    fn script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_antiword_text_wins() {
        let dir = tempfile::tempdir().unwrap();
        let reader = AntiwordReader::with_tools(
            script(dir.path(), "antiword", "echo from antiword"),
            script(dir.path(), "catdoc", "echo from catdoc"),
        );
        let text = reader.text(Path::new("memo.doc")).await.unwrap();
        assert_eq!(text.trim(), "from antiword");
    }

    #[tokio::test]
    async fn test_empty_antiword_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let reader = AntiwordReader::with_tools(
            script(dir.path(), "antiword", "printf ''"),
            script(dir.path(), "catdoc", "echo from catdoc"),
        );
        let text = reader.text(Path::new("memo.doc")).await.unwrap();
        assert_eq!(text.trim(), "from catdoc");
    }

    #[tokio::test]
    async fn test_missing_antiword_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let reader = AntiwordReader::with_tools(
            "no-such-antiword-xyz",
            script(dir.path(), "catdoc", "echo from catdoc"),
        );
        let text = reader.text(Path::new("memo.doc")).await.unwrap();
        assert_eq!(text.trim(), "from catdoc");
    }

    #[tokio::test]
    async fn test_both_missing_is_unavailable() {
        let reader = AntiwordReader::with_tools("no-such-antiword-xyz", "no-such-catdoc-xyz");
        let err = reader.text(Path::new("memo.doc")).await.unwrap_err();
        assert_eq!(err.reason(), ReasonCode::CapabilityUnavailable);
    }

    #[tokio::test]
    async fn test_antiword_error_surfaces_without_catdoc() {
        let dir = tempfile::tempdir().unwrap();
        let reader = AntiwordReader::with_tools(
            script(dir.path(), "antiword", "echo 'not a Word document' >&2; exit 1"),
            "no-such-catdoc-xyz",
        );
        let err = reader.text(Path::new("memo.doc")).await.unwrap_err();
        assert_eq!(err.reason(), ReasonCode::CorruptInput);
    }
}
