//! Extraction error types.

use docsift_core::CapabilityError;
use thiserror::Error;

/// Errors raised inside the capability adapters.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// External program is not installed.
    #[error("{0} is not installed or not on PATH")]
    ToolMissing(String),

    /// External program exited unsuccessfully.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// External program produced output we could not use.
    #[error("{tool} produced unusable output: {message}")]
    BadOutput { tool: String, message: String },

    /// IO error during extraction.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// PDF-specific extraction error.
    #[cfg(feature = "pdf")]
    #[error("PDF extraction error: {0}")]
    Pdf(String),

    /// DOCX-specific extraction error.
    #[cfg(feature = "docx")]
    #[error("DOCX extraction error: {0}")]
    Docx(String),

    /// Image decoding or transformation error.
    #[cfg(feature = "image")]
    #[error("Image error: {0}")]
    Image(String),

    /// Recognition engine error.
    #[cfg(feature = "ocr")]
    #[error("OCR error: {0}")]
    Ocr(String),

    /// Task join error from spawn_blocking.
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

impl ExtractError {
    /// Tool name used when surfacing the error as a capability failure.
    fn tool(&self) -> String {
        match self {
            Self::ToolMissing(tool) => tool.clone(),
            Self::ToolFailed { tool, .. } | Self::BadOutput { tool, .. } => tool.clone(),
            #[cfg(feature = "pdf")]
            Self::Pdf(_) => "pdf-extract".to_string(),
            #[cfg(feature = "docx")]
            Self::Docx(_) => "docx-rs".to_string(),
            #[cfg(feature = "image")]
            Self::Image(_) => "image".to_string(),
            #[cfg(feature = "ocr")]
            Self::Ocr(_) => "tesseract".to_string(),
            Self::Io(_) | Self::TaskJoin(_) => "extractor".to_string(),
        }
    }
}

impl From<ExtractError> for CapabilityError {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::ToolMissing(tool) => {
                CapabilityError::unavailable(tool, "not installed or not on PATH")
            }
            ExtractError::Io(io) => CapabilityError::Io(io),
            other => CapabilityError::failed(other.tool(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsift_core::ReasonCode;

    #[test]
    fn test_missing_tool_is_unavailable() {
        let cap: CapabilityError = ExtractError::ToolMissing("antiword".into()).into();
        assert_eq!(cap.reason(), ReasonCode::CapabilityUnavailable);
        assert!(cap.to_string().contains("antiword"));
    }

    #[test]
    fn test_failed_tool_is_corrupt_input() {
        let cap: CapabilityError = ExtractError::ToolFailed {
            tool: "pdftoppm".into(),
            status: "exit status: 1".into(),
            stderr: "Syntax Error".into(),
        }
        .into();
        assert_eq!(cap.reason(), ReasonCode::CorruptInput);
        assert!(cap.to_string().contains("pdftoppm"));
    }
}
