//! Plain-text sidecar per accepted document.

use chrono::Utc;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SiftResult;
use crate::types::{Method, PageRef, TextUnit};

/// Write `txt/<relative>.txt` under `run_output`.
///
/// `relative` is the input path relative to the run's input directory.
pub fn write_sidecar(
    run_output: &Path,
    relative: &Path,
    method: Method,
    score: f64,
    units: &[TextUnit],
) -> SiftResult<PathBuf> {
    let mut target = run_output.join("txt").join(relative);
    let name = target
        .file_name()
        .map(|n| format!("{}.txt", n.to_string_lossy()))
        .unwrap_or_else(|| "document.txt".to_string());
    target.set_file_name(name);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let source = relative
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut body = String::new();
    let _ = writeln!(body, "source: {}", source);
    let _ = writeln!(body, "method: {}", method);
    let _ = writeln!(body, "used_ocr: {}", method.uses_visual_recognition());
    let _ = writeln!(body, "reliability: {:.2}", score);
    let _ = writeln!(body, "extracted_at: {}", Utc::now().to_rfc3339());
    body.push_str("---\n");
    for unit in units {
        if let PageRef::Index(i) = unit.page {
            let _ = writeln!(body, "[page {}]", i);
        }
        body.push_str(unit.text.trim_end());
        body.push_str("\n\n");
    }

    fs::write(&target, body)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Reliability;

    #[test]
    fn test_sidecar_layout() {
        let dir = tempfile::tempdir().unwrap();
        let units = vec![
            TextUnit::new("scan.pdf", PageRef::Index(1), "first", Method::OcrPass1, Reliability::new(0.7)),
            TextUnit::new("scan.pdf", PageRef::Index(2), "second\n", Method::OcrPass1, Reliability::new(0.6)),
        ];
        let path = write_sidecar(dir.path(), Path::new("sub/scan.pdf"), Method::OcrPass1, 0.65, &units).unwrap();

        assert_eq!(path, dir.path().join("txt/sub/scan.pdf.txt"));
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("source: scan.pdf\nmethod: OCR-pass-1\nused_ocr: true\nreliability: 0.65\n"));
        assert!(content.contains("---\n[page 1]\nfirst\n\n[page 2]\nsecond\n\n"));
    }
}
