//! Helpers for invoking external command-line tools.

use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};

/// Whether `program` resolves to an executable file on `PATH`.
pub fn command_available(program: &str) -> bool {
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Run a prepared command, mapping spawn and exit failures.
///
/// A program that cannot be spawned because it does not exist becomes
/// [`ExtractError::ToolMissing`]; a non-zero exit becomes
/// [`ExtractError::ToolFailed`] carrying the tail of stderr.
pub async fn run_tool(tool: &str, command: &mut Command) -> ExtractResult<Output> {
    command.kill_on_drop(true);
    let output = command.output().await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ExtractError::ToolMissing(tool.to_string())
        } else {
            ExtractError::Io(e)
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");
        return Err(ExtractError::ToolFailed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: tail,
        });
    }

    debug!(tool, bytes = output.stdout.len(), "Tool finished");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_available() {
        assert!(command_available("sh"));
        assert!(!command_available("definitely-not-a-real-tool-xyz"));
    }

    #[tokio::test]
    async fn test_run_tool_missing() {
        let mut cmd = Command::new("definitely-not-a-real-tool-xyz");
        let err = run_tool("xyz", &mut cmd).await.unwrap_err();
        assert!(matches!(err, ExtractError::ToolMissing(_)));
    }

    #[tokio::test]
    async fn test_run_tool_failure_keeps_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo broken >&2; exit 3");
        let err = run_tool("sh", &mut cmd).await.unwrap_err();
        match err {
            ExtractError::ToolFailed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_run_tool_success() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("printf hello");
        let out = run_tool("sh", &mut cmd).await.unwrap();
        assert_eq!(out.stdout, b"hello");
    }
}
