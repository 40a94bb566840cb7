//! Visual text recognition via Tesseract.

use async_trait::async_trait;
use docsift_core::{CapabilityResult, OcrEngine, OcrRequest, Rotation};
use image::DynamicImage;
use once_cell::sync::OnceCell;
use rusty_tesseract::{Args, Image};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::imaging;

/// OCR engine backed by the tesseract binary through rusty-tesseract.
#[derive(Debug, Clone, Default)]
pub struct TesseractOcr {
    /// Result of the first `tesseract --version` check.
    available: OnceCell<bool>,
}

impl TesseractOcr {
    pub fn new() -> Self {
        Self::default()
    }

    fn recognize_sync(image_path: &Path, request: &OcrRequest) -> ExtractResult<String> {
        let work_dir = request
            .work_dir
            .clone()
            .or_else(|| image_path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let prepared = prepare_input(image_path, request.rotation, &work_dir)?;

        let result = Image::from_path(prepared.clone())
            .map_err(|e| ExtractError::Ocr(e.to_string()))
            .and_then(|tesseract_image| {
                let defaults = Args::default();
                let args = Args {
                    lang: request.language.clone(),
                    psm: Some(request.layout.psm()),
                    dpi: request
                        .dpi
                        .and_then(|d| i32::try_from(d).ok())
                        .or(defaults.dpi),
                    ..defaults
                };
                rusty_tesseract::image_to_string(&tesseract_image, &args)
                    .map_err(|e| ExtractError::Ocr(e.to_string()))
            });

        if let Err(e) = std::fs::remove_file(&prepared) {
            debug!(path = %prepared.display(), error = %e, "Could not remove OCR input");
        }
        result
    }
}

/// Write the grayscale, rotated copy tesseract reads into `work_dir`.
fn prepare_input(image_path: &Path, rotation: Rotation, work_dir: &Path) -> ExtractResult<PathBuf> {
    let img = image::open(image_path).map_err(|e| ExtractError::Image(e.to_string()))?;
    let gray = DynamicImage::ImageLuma8(img.to_luma8());
    let oriented = imaging::rotate(gray, rotation);

    let stem = image_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let prepared = work_dir.join(format!("{}.ocr-{}.png", stem, rotation.degrees()));
    oriented
        .save(&prepared)
        .map_err(|e| ExtractError::Image(e.to_string()))?;
    Ok(prepared)
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize(&self, image: &Path, request: &OcrRequest) -> CapabilityResult<String> {
        if !self.is_available() {
            return Err(ExtractError::ToolMissing("tesseract".to_string()).into());
        }
        let path = image.to_path_buf();
        let request = request.clone();

        let text = tokio::task::spawn_blocking(move || Self::recognize_sync(&path, &request))
            .await
            .map_err(ExtractError::from)??;
        Ok(text)
    }

    fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| rusty_tesseract::get_tesseract_version().is_ok())
    }
}
