//! Wiring of capabilities into per-category escalation ladders.

use async_trait::async_trait;
use docsift_core::{
    CapabilityError, CapabilityResult, Category, EmbeddedImage, EscalationEngine,
    Ladder, LadderSet, LegacyExtractor, Method, OcrEngine, OcrRequest, OfficeExtractor,
    Rasterizer, ReliabilityScorer, SiftConfig, TextLayerExtractor,
};
use std::path::Path;
use std::sync::Arc;

use crate::legacy::AntiwordReader;
use crate::passes::{
    EmbeddedImagePass, ImageOcrPass, LegacyTextPass, NativeTextPass, OcrTier, OfficeTextPass,
    PageOcrPass, PlainTextPass,
};
use crate::raster::PdftoppmRasterizer;

#[cfg(feature = "docx")]
use crate::docx::DocxReader;
#[cfg(feature = "ocr")]
use crate::ocr::TesseractOcr;
#[cfg(feature = "pdf")]
use crate::pdf::PdfTextLayer;

/// The external capabilities the passes are built on.
#[derive(Clone)]
pub struct Capabilities {
    pub text_layer: Arc<dyn TextLayerExtractor>,
    pub rasterizer: Arc<dyn Rasterizer>,
    pub ocr: Arc<dyn OcrEngine>,
    pub office: Arc<dyn OfficeExtractor>,
    pub legacy: Arc<dyn LegacyExtractor>,
}

impl Capabilities {
    /// Capabilities backed by the compiled-in libraries and installed tools.
    ///
    /// A capability whose feature is disabled reports itself unavailable, so
    /// the inputs that need it are quarantined rather than dropped.
    pub fn system() -> Self {
        #[cfg(feature = "pdf")]
        let text_layer: Arc<dyn TextLayerExtractor> = Arc::new(PdfTextLayer::new());
        #[cfg(not(feature = "pdf"))]
        let text_layer: Arc<dyn TextLayerExtractor> = Arc::new(Missing("pdf"));

        #[cfg(feature = "ocr")]
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new());
        #[cfg(not(feature = "ocr"))]
        let ocr: Arc<dyn OcrEngine> = Arc::new(Missing("ocr"));

        #[cfg(feature = "docx")]
        let office: Arc<dyn OfficeExtractor> = Arc::new(DocxReader::new());
        #[cfg(not(feature = "docx"))]
        let office: Arc<dyn OfficeExtractor> = Arc::new(Missing("docx"));

        Self {
            text_layer,
            rasterizer: Arc::new(PdftoppmRasterizer::new()),
            ocr,
            office,
            legacy: Arc::new(AntiwordReader::new()),
        }
    }

    /// Names of capabilities that cannot currently run.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.rasterizer.is_available() {
            missing.push("rasterizer");
        }
        if !self.ocr.is_available() {
            missing.push("ocr");
        }
        missing
    }
}

/// Stand-in for a capability compiled out of this build.
#[allow(dead_code)]
struct Missing(&'static str);

impl Missing {
    fn error(&self) -> CapabilityError {
        CapabilityError::unavailable(self.0, "feature not enabled in this build")
    }
}

#[async_trait]
impl TextLayerExtractor for Missing {
    async fn page_texts(&self, _document: &Path) -> CapabilityResult<Vec<String>> {
        Err(self.error())
    }
}

#[async_trait]
impl OcrEngine for Missing {
    async fn recognize(&self, _image: &Path, _request: &OcrRequest) -> CapabilityResult<String> {
        Err(self.error())
    }

    fn is_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl OfficeExtractor for Missing {
    async fn blocks(&self, _document: &Path) -> CapabilityResult<Vec<String>> {
        Err(self.error())
    }

    async fn embedded_images(
        &self,
        _document: &Path,
        _scratch: &Path,
        _max: usize,
    ) -> CapabilityResult<Vec<EmbeddedImage>> {
        Err(self.error())
    }
}

/// Builds the ladder for every input category from configuration.
pub struct LadderFactory;

impl LadderFactory {
    /// Ladders for all categories.
    ///
    /// `engine` drives the nested per-image ladders of office documents; it
    /// is re-rooted into each attempt's scratch directory.
    pub fn build(config: &SiftConfig, caps: &Capabilities, engine: &EscalationEngine) -> LadderSet {
        let scorer = ReliabilityScorer::with_density_norm(config.density_norm);
        let cutoffs = &config.cutoffs;
        let lang = config.ocr_lang.as_str();

        let paginated = Ladder::new()
            .rung(
                Arc::new(NativeTextPass::new(caps.text_layer.clone(), scorer)),
                cutoffs.pdf_text,
            )
            .rung(
                Arc::new(PageOcrPass::new(
                    OcrTier::standard(config.ocr_a_dpi),
                    lang,
                    caps.rasterizer.clone(),
                    caps.ocr.clone(),
                    scorer,
                )),
                cutoffs.ocr_a,
            )
            .rung(
                Arc::new(PageOcrPass::new(
                    OcrTier::high_resolution(config.ocr_b_dpi),
                    lang,
                    caps.rasterizer.clone(),
                    caps.ocr.clone(),
                    scorer,
                )),
                cutoffs.ocr_b,
            );

        let embedded_ladder = Ladder::new()
            .rung(
                Arc::new(ImageOcrPass::new(Method::OcrPass1, lang, caps.ocr.clone(), scorer)),
                cutoffs.ocr_a,
            )
            .rung(
                Arc::new(
                    ImageOcrPass::new(Method::OcrPass2, lang, caps.ocr.clone(), scorer)
                        .with_rotation_retries(),
                ),
                cutoffs.ocr_b,
            );

        let office = Ladder::new()
            .rung(
                Arc::new(OfficeTextPass::new(caps.office.clone(), scorer)),
                cutoffs.office,
            )
            .rung(
                Arc::new(EmbeddedImagePass::new(
                    caps.office.clone(),
                    engine.clone(),
                    embedded_ladder,
                    config.max_embedded_images,
                )),
                cutoffs.ocr_b,
            );

        let legacy = Ladder::new().rung(
            Arc::new(LegacyTextPass::new(caps.legacy.clone(), scorer)),
            cutoffs.legacy,
        );

        let plain = Ladder::new().rung(Arc::new(PlainTextPass::new(scorer)), cutoffs.plain_text);

        let image = Ladder::new()
            .rung(
                Arc::new(
                    ImageOcrPass::new(Method::ImageOcr, lang, caps.ocr.clone(), scorer)
                        .with_upsampling(true),
                ),
                cutoffs.image,
            )
            .rung(
                Arc::new(
                    ImageOcrPass::new(Method::ImageOcr, lang, caps.ocr.clone(), scorer)
                        .with_rotation_retries()
                        .with_upsampling(true),
                ),
                cutoffs.image_retry,
            );

        LadderSet::new()
            .with(Category::Paginated, paginated)
            .with(Category::Office, office)
            .with(Category::Legacy, legacy)
            .with(Category::PlainText, plain)
            .with(Category::Image, image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fakes::{FakeOcr, FakeOffice, FakeRasterizer, FakeTextLayer, PROSE};
    use docsift_core::{FixedSpaceGauge, InputUnit, ReasonCode};
    use std::time::Duration;

    struct NoLegacy;

    #[async_trait]
    impl LegacyExtractor for NoLegacy {
        async fn text(&self, _document: &Path) -> CapabilityResult<String> {
            Err(CapabilityError::unavailable("antiword/catdoc", "missing"))
        }
    }

    fn caps(native: Vec<String>, ocr_text: &str, pages: usize) -> Capabilities {
        Capabilities {
            text_layer: Arc::new(FakeTextLayer(native)),
            rasterizer: Arc::new(FakeRasterizer::new(pages)),
            ocr: Arc::new(FakeOcr::uniform(ocr_text)),
            office: Arc::new(FakeOffice {
                blocks: vec![PROSE.repeat(3)],
                images: 0,
            }),
            legacy: Arc::new(NoLegacy),
        }
    }

    fn engine(root: &Path) -> EscalationEngine {
        EscalationEngine::new(root)
            .with_space_gauge(Arc::new(FixedSpaceGauge(u64::MAX)))
            .with_timeout(Duration::from_secs(5))
    }

    #[test]
    fn test_ladder_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let config = SiftConfig::default();
        let set = LadderFactory::build(&config, &caps(Vec::new(), "", 0), &engine(dir.path()));

        let paginated = set.get(Category::Paginated).unwrap();
        let methods: Vec<Method> = paginated.rungs().iter().map(|r| r.pass.method()).collect();
        assert_eq!(methods, vec![Method::PaginatedText, Method::OcrPass1, Method::OcrPass2]);
        let cutoffs: Vec<f64> = paginated.rungs().iter().map(|r| r.cutoff).collect();
        assert_eq!(cutoffs, vec![0.75, 0.65, 0.55]);

        assert_eq!(set.get(Category::Office).unwrap().len(), 2);
        assert_eq!(set.get(Category::Legacy).unwrap().len(), 1);
        assert_eq!(set.get(Category::PlainText).unwrap().rungs()[0].cutoff, 0.0);
        assert_eq!(set.get(Category::Image).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scanned_pdf_escalates_to_first_ocr_rung() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        std::fs::write(&path, b"%PDF").unwrap();
        let unit = InputUnit::from_path(&path, Category::Paginated).unwrap();

        let engine = engine(dir.path());
        let set = LadderFactory::build(
            &SiftConfig::default(),
            &caps(vec![String::new(); 5], &PROSE.repeat(3), 5),
            &engine,
        );
        let accepted = engine
            .escalate(&unit, set.get(Category::Paginated).unwrap())
            .await
            .unwrap();

        assert_eq!(accepted.method, Method::OcrPass1);
        assert_eq!(accepted.outcome.units.len(), 5);
        assert_eq!(accepted.reports.len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_without_tools_is_capability_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.doc");
        std::fs::write(&path, b"doc").unwrap();
        let unit = InputUnit::from_path(&path, Category::Legacy).unwrap();

        let engine = engine(dir.path());
        let set = LadderFactory::build(&SiftConfig::default(), &caps(Vec::new(), "", 0), &engine);
        let failed = engine
            .escalate(&unit, set.get(Category::Legacy).unwrap())
            .await
            .unwrap_err();
        assert_eq!(failed.reason, ReasonCode::CapabilityUnavailable);
    }

    #[tokio::test]
    async fn test_missing_stub_reports_unavailable() {
        let stub = Missing("pdf");
        let err = stub.page_texts(Path::new("a.pdf")).await.unwrap_err();
        assert_eq!(err.reason(), ReasonCode::CapabilityUnavailable);
        assert!(!stub.is_available());
    }
}
