//! External capability traits and their shared error type.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::ReasonCode;

/// Result type alias for capability calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Failure of an external capability.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The tool or library is not installed or cannot start.
    #[error("{tool} is unavailable: {message}")]
    Unavailable { tool: String, message: String },

    /// The tool ran but rejected the input.
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    /// IO error while preparing input or reading output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CapabilityError {
    /// Create an unavailable-tool error.
    pub fn unavailable(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Create a failed-invocation error.
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Quarantine reason this failure maps to.
    pub fn reason(&self) -> ReasonCode {
        match self {
            Self::Unavailable { .. } => ReasonCode::CapabilityUnavailable,
            Self::Failed { .. } | Self::Io(_) => ReasonCode::CorruptInput,
        }
    }
}

/// Color handling when rasterizing a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Grayscale,
    Color,
}

/// Page layout analysis requested from the recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Treat the image as a single uniform block of text.
    UniformBlock,
    /// Fully automatic segmentation.
    Auto,
}

impl LayoutMode {
    /// Tesseract page segmentation mode.
    pub fn psm(&self) -> i32 {
        match self {
            LayoutMode::UniformBlock => 6,
            LayoutMode::Auto => 3,
        }
    }
}

/// Rotation applied to an image before recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Cw90,
    Cw270,
}

impl Rotation {
    /// Rotation in degrees.
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw270 => 270,
        }
    }
}

/// Parameters for one recognition call.
#[derive(Debug, Clone)]
pub struct OcrRequest {
    pub language: String,
    pub layout: LayoutMode,
    pub rotation: Rotation,
    /// Resolution the image was rendered at, when known.
    pub dpi: Option<u32>,
    /// Where the engine may write intermediate images. Falls back to the
    /// image's own directory.
    pub work_dir: Option<PathBuf>,
}

impl OcrRequest {
    pub fn new(language: impl Into<String>, layout: LayoutMode) -> Self {
        Self {
            language: language.into(),
            layout,
            rotation: Rotation::None,
            dpi: None,
            work_dir: None,
        }
    }

    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = Some(dpi);
        self
    }

    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self {
            rotation,
            ..self.clone()
        }
    }
}

/// An image pulled out of an office package, ready for recognition.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Entry name inside the package.
    pub name: String,
    /// Extracted file on scratch.
    pub path: PathBuf,
    /// 1-based position among recognized images.
    pub index: u32,
}

/// Native text layer of a paginated document.
#[async_trait]
pub trait TextLayerExtractor: Send + Sync {
    /// Text of every page, in page order.
    async fn page_texts(&self, document: &Path) -> CapabilityResult<Vec<String>>;
}

/// Turns document pages into images.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Number of pages in the document.
    async fn page_count(&self, document: &Path) -> CapabilityResult<usize>;

    /// Render one 1-based page into `out_dir`, returning the image path.
    async fn rasterize(
        &self,
        document: &Path,
        page: usize,
        dpi: u32,
        color: ColorMode,
        out_dir: &Path,
    ) -> CapabilityResult<PathBuf>;

    /// Whether the backing tool can be invoked.
    fn is_available(&self) -> bool;
}

/// Visual text recognition.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path, request: &OcrRequest) -> CapabilityResult<String>;

    fn is_available(&self) -> bool;
}

/// Modern word-processor reader.
#[async_trait]
pub trait OfficeExtractor: Send + Sync {
    /// Text blocks in document order (body, tables, headers, footers, notes, comments).
    async fn blocks(&self, document: &Path) -> CapabilityResult<Vec<String>>;

    /// Raster images embedded in the package, at most `max`, written under `scratch`.
    async fn embedded_images(
        &self,
        document: &Path,
        scratch: &Path,
        max: usize,
    ) -> CapabilityResult<Vec<EmbeddedImage>>;
}

/// Legacy word-processor reader.
#[async_trait]
pub trait LegacyExtractor: Send + Sync {
    async fn text(&self, document: &Path) -> CapabilityResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(
            CapabilityError::unavailable("tesseract", "not found").reason(),
            ReasonCode::CapabilityUnavailable
        );
        assert_eq!(
            CapabilityError::failed("pdftoppm", "exit 1").reason(),
            ReasonCode::CorruptInput
        );
        let io: CapabilityError = std::io::Error::new(std::io::ErrorKind::NotFound, "x").into();
        assert_eq!(io.reason(), ReasonCode::CorruptInput);
    }

    #[test]
    fn test_layout_psm() {
        assert_eq!(LayoutMode::UniformBlock.psm(), 6);
        assert_eq!(LayoutMode::Auto.psm(), 3);
    }

    #[test]
    fn test_rotated_request_keeps_language() {
        let req = OcrRequest::new("deu", LayoutMode::Auto)
            .with_dpi(400)
            .rotated(Rotation::Cw270);
        assert_eq!(req.language, "deu");
        assert_eq!(req.rotation.degrees(), 270);
        assert_eq!(req.dpi, Some(400));
    }
}
