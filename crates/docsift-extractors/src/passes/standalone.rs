//! Recognition of a single raster image as one whole-document unit.

use async_trait::async_trait;
use docsift_core::{
    CapabilityError, ExtractionPass, InputUnit, LayoutMode, Method, OcrEngine, OcrRequest,
    PageRef, PassContext, PassFailure, PassOutcome, Reliability, ReliabilityScorer, Rotation,
    TextUnit,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::unavailable;

/// OCR over one image file, trying orientations until one clears the cutoff.
pub struct ImageOcrPass {
    method: Method,
    request: OcrRequest,
    rotations: Vec<Rotation>,
    upsample: bool,
    ocr: Arc<dyn OcrEngine>,
    scorer: ReliabilityScorer,
}

impl ImageOcrPass {
    /// Upright recognition with uniform block layout.
    pub fn new(
        method: Method,
        language: impl Into<String>,
        ocr: Arc<dyn OcrEngine>,
        scorer: ReliabilityScorer,
    ) -> Self {
        Self {
            method,
            request: OcrRequest::new(language, LayoutMode::UniformBlock),
            rotations: vec![Rotation::None],
            upsample: false,
            ocr,
            scorer,
        }
    }

    /// Switch to automatic layout with 90 and 270 degree retries.
    pub fn with_rotation_retries(mut self) -> Self {
        self.request.layout = LayoutMode::Auto;
        self.rotations = vec![Rotation::None, Rotation::Cw90, Rotation::Cw270];
        self
    }

    /// Upsample small inputs on a scratch copy before recognition.
    pub fn with_upsampling(mut self, enabled: bool) -> Self {
        self.upsample = enabled;
        self
    }

    #[cfg(feature = "image")]
    async fn prepare(&self, unit: &InputUnit, ctx: &PassContext<'_>) -> PathBuf {
        if !self.upsample {
            return unit.path.clone();
        }
        let copy = ctx.scratch.join(format!("input.{}", unit.extension));
        let prepared = match tokio::fs::copy(&unit.path, &copy).await {
            Ok(_) => {
                let target = copy.clone();
                tokio::task::spawn_blocking(move || crate::imaging::upsample_if_small(&target))
                    .await
                    .ok()
                    .and_then(Result::ok)
                    .is_some()
            }
            Err(_) => false,
        };
        if prepared {
            copy
        } else {
            debug!(file = %unit.file_name(), "Recognizing original image without upsampling");
            unit.path.clone()
        }
    }

    #[cfg(not(feature = "image"))]
    async fn prepare(&self, unit: &InputUnit, _ctx: &PassContext<'_>) -> PathBuf {
        unit.path.clone()
    }
}

#[async_trait]
impl ExtractionPass for ImageOcrPass {
    fn method(&self) -> Method {
        self.method
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        if !self.ocr.is_available() {
            return Err(unavailable("OCR engine"));
        }
        let image = self.prepare(unit, &ctx).await;
        let request = self.request.clone().in_dir(ctx.scratch);

        let mut best: Option<(String, Reliability)> = None;
        let mut last_error: Option<CapabilityError> = None;
        for rotation in &self.rotations {
            match self.ocr.recognize(&image, &request.rotated(*rotation)).await {
                Ok(text) => {
                    let score = self.scorer.score(&text, self.method);
                    if best.as_ref().map_or(true, |(_, s)| score > *s) {
                        best = Some((text, score));
                    }
                    if best.as_ref().is_some_and(|(_, s)| s.value() >= ctx.cutoff) {
                        break;
                    }
                }
                Err(e @ CapabilityError::Unavailable { .. }) => return Err(e.into()),
                Err(e) => {
                    debug!(file = %unit.file_name(), rotation = rotation.degrees(), error = %e, "Recognition failed");
                    last_error = Some(e);
                }
            }
        }

        match (best, last_error) {
            (Some((text, reliability)), _) => Ok(PassOutcome::new(vec![TextUnit::new(
                unit.file_name(),
                PageRef::Whole,
                text,
                self.method,
                reliability,
            )])),
            (None, Some(e)) => Err(e.into()),
            (None, None) => Ok(PassOutcome::default()),
        }
    }
}
