//! Passes over paginated documents: native text layer and page OCR.

use async_trait::async_trait;
use docsift_core::{
    CapabilityError, ColorMode, ExtractionPass, InputUnit, LayoutMode, Method, OcrEngine,
    OcrRequest, PageRef, PassContext, PassFailure, PassOutcome, Rasterizer, ReasonCode,
    Reliability, ReliabilityScorer, Rotation, TextLayerExtractor, TextUnit,
};
use std::sync::Arc;
use tracing::{debug, warn};

use super::unavailable;

/// Pages sampled by the scan-only check.
const SAMPLE_PAGES: usize = 3;
/// Below this many characters across the sampled pages, the document is
/// treated as a scan and the text layer is not scored.
const SAMPLE_MIN_CHARS: usize = 40;

/// Up to `samples` evenly spaced 0-based page indices, first and last included.
pub fn sample_page_indices(page_count: usize, samples: usize) -> Vec<usize> {
    if page_count == 0 || samples == 0 {
        return Vec::new();
    }
    if page_count <= samples {
        return (0..page_count).collect();
    }
    if samples == 1 {
        return vec![0];
    }
    let mut indices: Vec<usize> = (0..samples)
        .map(|i| i * (page_count - 1) / (samples - 1))
        .collect();
    indices.dedup();
    indices
}

/// Native text layer, one unit per page.
pub struct NativeTextPass {
    text_layer: Arc<dyn TextLayerExtractor>,
    scorer: ReliabilityScorer,
}

impl NativeTextPass {
    pub fn new(text_layer: Arc<dyn TextLayerExtractor>, scorer: ReliabilityScorer) -> Self {
        Self { text_layer, scorer }
    }
}

#[async_trait]
impl ExtractionPass for NativeTextPass {
    fn method(&self) -> Method {
        Method::PaginatedText
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let pages = self.text_layer.page_texts(&unit.path).await?;
        let page_count = pages.len();

        let sampled: usize = sample_page_indices(page_count, SAMPLE_PAGES)
            .into_iter()
            .map(|i| pages[i].trim().chars().count())
            .sum();
        if sampled < SAMPLE_MIN_CHARS {
            debug!(file = %unit.file_name(), page_count, sampled, "Text layer looks scan-only");
            return Ok(PassOutcome::default()
                .with_page_count(page_count)
                .with_note(format!("scan-only check: {} chars on sampled pages", sampled)));
        }

        let source = unit.file_name();
        let units = pages
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                let reliability = self.scorer.score(&text, Method::PaginatedText);
                TextUnit::new(
                    source.clone(),
                    PageRef::Index(i as u32 + 1),
                    text,
                    Method::PaginatedText,
                    reliability,
                )
            })
            .collect();
        Ok(PassOutcome::new(units).with_page_count(page_count))
    }
}

/// Rendering and recognition settings for one OCR rung.
#[derive(Debug, Clone)]
pub struct OcrTier {
    pub method: Method,
    pub dpi: u32,
    pub color: ColorMode,
    pub layout: LayoutMode,
    /// Orientations tried in order until one clears the rung cutoff.
    pub rotations: Vec<Rotation>,
}

impl OcrTier {
    /// Standard resolution, uniform block layout, upright only.
    pub fn standard(dpi: u32) -> Self {
        Self {
            method: Method::OcrPass1,
            dpi,
            color: ColorMode::Grayscale,
            layout: LayoutMode::UniformBlock,
            rotations: vec![Rotation::None],
        }
    }

    /// High resolution, automatic layout, with rotation retries.
    pub fn high_resolution(dpi: u32) -> Self {
        Self {
            method: Method::OcrPass2,
            dpi,
            color: ColorMode::Grayscale,
            layout: LayoutMode::Auto,
            rotations: vec![Rotation::None, Rotation::Cw90, Rotation::Cw270],
        }
    }
}

/// Rasterize every page and recognize it.
pub struct PageOcrPass {
    tier: OcrTier,
    language: String,
    rasterizer: Arc<dyn Rasterizer>,
    ocr: Arc<dyn OcrEngine>,
    scorer: ReliabilityScorer,
}

impl PageOcrPass {
    pub fn new(
        tier: OcrTier,
        language: impl Into<String>,
        rasterizer: Arc<dyn Rasterizer>,
        ocr: Arc<dyn OcrEngine>,
        scorer: ReliabilityScorer,
    ) -> Self {
        Self {
            tier,
            language: language.into(),
            rasterizer,
            ocr,
            scorer,
        }
    }

    /// Best-scoring recognition of one page image across the tier's rotations.
    async fn recognize_page(
        &self,
        image: &std::path::Path,
        request: &OcrRequest,
        cutoff: f64,
    ) -> Result<(String, Reliability), CapabilityError> {
        let mut best: Option<(String, Reliability)> = None;
        for rotation in &self.tier.rotations {
            let text = match self.ocr.recognize(image, &request.rotated(*rotation)).await {
                Ok(text) => text,
                Err(e @ CapabilityError::Unavailable { .. }) => return Err(e),
                Err(e) => {
                    debug!(rotation = rotation.degrees(), error = %e, "Recognition failed for orientation");
                    continue;
                }
            };
            let score = self.scorer.score(&text, self.tier.method);
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((text, score));
            }
            if best.as_ref().is_some_and(|(_, s)| s.value() >= cutoff) {
                break;
            }
        }
        Ok(best.unwrap_or_default())
    }
}

#[async_trait]
impl ExtractionPass for PageOcrPass {
    fn method(&self) -> Method {
        self.tier.method
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        if !self.rasterizer.is_available() {
            return Err(unavailable("rasterizer"));
        }
        if !self.ocr.is_available() {
            return Err(unavailable("OCR engine"));
        }

        let page_count = self.rasterizer.page_count(&unit.path).await?;
        let source = unit.file_name();
        let request = OcrRequest::new(self.language.clone(), self.tier.layout)
            .with_dpi(self.tier.dpi)
            .in_dir(ctx.scratch);
        let mut units = Vec::with_capacity(page_count);
        let mut unrendered = 0usize;

        for page in 1..=page_count {
            let image = match self
                .rasterizer
                .rasterize(&unit.path, page, self.tier.dpi, self.tier.color, ctx.scratch)
                .await
            {
                Ok(image) => image,
                Err(e @ CapabilityError::Unavailable { .. }) => return Err(e.into()),
                Err(e) => {
                    warn!(file = %source, page, error = %e, "Page could not be rasterized");
                    unrendered += 1;
                    units.push(TextUnit::new(
                        source.clone(),
                        PageRef::Index(page as u32),
                        String::new(),
                        self.tier.method,
                        Reliability::default(),
                    ));
                    continue;
                }
            };

            let (text, reliability) = self.recognize_page(&image, &request, ctx.cutoff).await?;
            // Pages are rendered one at a time; keep scratch bounded to one image.
            if let Err(e) = tokio::fs::remove_file(&image).await {
                debug!(path = %image.display(), error = %e, "Could not remove page image");
            }
            units.push(TextUnit::new(
                source.clone(),
                PageRef::Index(page as u32),
                text,
                self.tier.method,
                reliability,
            ));
        }

        if page_count > 0 && unrendered == page_count {
            return Err(PassFailure::new(
                ReasonCode::CorruptInput,
                format!("none of {} pages could be rasterized", page_count),
            ));
        }

        Ok(PassOutcome::new(units).with_page_count(page_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fakes::{FakeOcr, FakeRasterizer, FakeTextLayer, PROSE};
    use docsift_core::{AggregateMode, Category};
    use std::path::Path;
    use std::sync::atomic::Ordering;

    fn unit(dir: &Path) -> InputUnit {
        let path = dir.join("scan.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        InputUnit::from_path(path, Category::Paginated).unwrap()
    }

    fn ctx(scratch: &Path, cutoff: f64) -> PassContext<'_> {
        PassContext { scratch, cutoff }
    }

    #[test]
    fn test_sample_page_indices() {
        assert_eq!(sample_page_indices(0, 3), Vec::<usize>::new());
        assert_eq!(sample_page_indices(2, 3), vec![0, 1]);
        assert_eq!(sample_page_indices(10, 3), vec![0, 4, 9]);
        assert_eq!(sample_page_indices(800, 3), vec![0, 399, 799]);
        assert_eq!(sample_page_indices(5, 1), vec![0]);
    }

    #[tokio::test]
    async fn test_native_text_one_unit_per_page() {
        let dir = tempfile::tempdir().unwrap();
        let pass = NativeTextPass::new(
            Arc::new(FakeTextLayer(vec![PROSE.repeat(3), String::new()])),
            ReliabilityScorer::default(),
        );
        let outcome = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.75))
            .await
            .unwrap();

        assert_eq!(outcome.page_count, Some(2));
        assert_eq!(outcome.units.len(), 2);
        assert_eq!(outcome.units[1].page, PageRef::Index(2));
        assert!(outcome.units[0].reliability.value() > 0.75);
        assert_eq!(outcome.units[1].reliability.value(), 0.0);
    }

    #[tokio::test]
    async fn test_scan_only_check_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let pages = vec![" ".to_string(); 10];
        let pass = NativeTextPass::new(Arc::new(FakeTextLayer(pages)), ReliabilityScorer::default());
        let outcome = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.75))
            .await
            .unwrap();

        assert!(outcome.units.is_empty());
        assert_eq!(outcome.page_count, Some(10));
        assert_eq!(outcome.aggregate(AggregateMode::Median), 0.0);
        assert!(outcome.note.unwrap().starts_with("scan-only check"));
    }

    #[tokio::test]
    async fn test_page_ocr_standard_tier() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = Arc::new(FakeOcr::uniform(&PROSE.repeat(3)));
        let raster = Arc::new(FakeRasterizer::new(4));
        let pass = PageOcrPass::new(
            OcrTier::standard(300),
            "eng",
            raster.clone(),
            ocr.clone(),
            ReliabilityScorer::default(),
        );
        let outcome = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.65))
            .await
            .unwrap();

        assert_eq!(outcome.units.len(), 4);
        assert!(outcome.units.iter().all(|u| u.method == Method::OcrPass1 && u.used_ocr()));
        assert_eq!(ocr.request_count(), 4);
        let requests = ocr.requests.lock().unwrap();
        assert_eq!(requests[0].1.layout, LayoutMode::UniformBlock);
        assert_eq!(requests[0].1.language, "eng");
        assert_eq!(requests[0].1.dpi, Some(300));
        assert_eq!(requests[0].1.work_dir.as_deref(), Some(dir.path()));
        // Page images do not accumulate in scratch.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_rotation_retry_keeps_best_orientation() {
        let dir = tempfile::tempdir().unwrap();
        let ocr = Arc::new(FakeOcr::rotations(&[
            (Rotation::None, "~~ ~~"),
            (Rotation::Cw90, &PROSE.repeat(3)),
            (Rotation::Cw270, "should not be tried"),
        ]));
        let pass = PageOcrPass::new(
            OcrTier::high_resolution(400),
            "eng",
            Arc::new(FakeRasterizer::new(1)),
            ocr.clone(),
            ReliabilityScorer::default(),
        );
        let outcome = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.55))
            .await
            .unwrap();

        assert_eq!(outcome.units[0].method, Method::OcrPass2);
        assert!(outcome.units[0].text.starts_with("The minutes"));
        // Stopped once the 90 degree result cleared the cutoff.
        assert_eq!(ocr.request_count(), 2);
        let requests = ocr.requests.lock().unwrap();
        assert_eq!(requests[1].1.layout, LayoutMode::Auto);
        assert_eq!(requests[1].1.dpi, Some(400));
    }

    #[tokio::test]
    async fn test_unrenderable_page_scores_zero() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = FakeRasterizer::new(3);
        raster.broken = vec![2];
        let pass = PageOcrPass::new(
            OcrTier::standard(300),
            "eng",
            Arc::new(raster),
            Arc::new(FakeOcr::uniform(&PROSE.repeat(3))),
            ReliabilityScorer::default(),
        );
        let outcome = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.65))
            .await
            .unwrap();

        assert_eq!(outcome.units.len(), 3);
        assert_eq!(outcome.units[1].reliability.value(), 0.0);
        assert!(outcome.units[1].text.is_empty());
    }

    #[tokio::test]
    async fn test_no_renderable_pages_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = FakeRasterizer::new(2);
        raster.broken = vec![1, 2];
        let pass = PageOcrPass::new(
            OcrTier::standard(300),
            "eng",
            Arc::new(raster),
            Arc::new(FakeOcr::uniform("x")),
            ReliabilityScorer::default(),
        );
        let err = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.65))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ReasonCode::CorruptInput);
    }

    #[tokio::test]
    async fn test_missing_tools_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut raster = FakeRasterizer::new(2);
        raster.available = false;
        let raster = Arc::new(raster);
        let pass = PageOcrPass::new(
            OcrTier::standard(300),
            "eng",
            raster.clone(),
            Arc::new(FakeOcr::uniform("x")),
            ReliabilityScorer::default(),
        );
        let err = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.65))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ReasonCode::CapabilityUnavailable);
        assert_eq!(raster.calls.load(Ordering::SeqCst), 0);

        let mut ocr = FakeOcr::uniform("x");
        ocr.available = false;
        let pass = PageOcrPass::new(
            OcrTier::standard(300),
            "eng",
            Arc::new(FakeRasterizer::new(2)),
            Arc::new(ocr),
            ReliabilityScorer::default(),
        );
        let err = pass
            .attempt(&unit(dir.path()), ctx(dir.path(), 0.65))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ReasonCode::CapabilityUnavailable);
    }
}
