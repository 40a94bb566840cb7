//! Passes over modern word-processor packages.

use async_trait::async_trait;
use docsift_core::{
    Category, EscalationEngine, ExtractionPass, InputUnit, Ladder, Method, OfficeExtractor,
    PageRef, PassContext, PassFailure, PassOutcome, ReasonCode, ReliabilityScorer, TextUnit,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Body, tables, headers, footers, notes and comments as one unit.
pub struct OfficeTextPass {
    reader: Arc<dyn OfficeExtractor>,
    scorer: ReliabilityScorer,
}

impl OfficeTextPass {
    pub fn new(reader: Arc<dyn OfficeExtractor>, scorer: ReliabilityScorer) -> Self {
        Self { reader, scorer }
    }
}

#[async_trait]
impl ExtractionPass for OfficeTextPass {
    fn method(&self) -> Method {
        Method::OfficeText
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let blocks = self.reader.blocks(&unit.path).await?;
        let text = blocks.join("\n\n");
        let reliability = self.scorer.score(&text, Method::OfficeText);
        Ok(PassOutcome::new(vec![TextUnit::new(
            unit.file_name(),
            PageRef::Whole,
            text,
            Method::OfficeText,
            reliability,
        )])
        .with_note(format!("{} blocks", blocks.len())))
    }
}

/// OCR of the raster images embedded in a package.
///
/// Each image runs its own two-rung ladder through a nested engine rooted in
/// this pass's scratch directory. Units keep the method of the rung that
/// accepted them and point at the image by its 1-based index.
pub struct EmbeddedImagePass {
    reader: Arc<dyn OfficeExtractor>,
    engine: EscalationEngine,
    ladder: Ladder,
    max_images: usize,
}

impl EmbeddedImagePass {
    pub fn new(
        reader: Arc<dyn OfficeExtractor>,
        engine: EscalationEngine,
        ladder: Ladder,
        max_images: usize,
    ) -> Self {
        Self {
            reader,
            engine,
            ladder,
            max_images,
        }
    }
}

#[async_trait]
impl ExtractionPass for EmbeddedImagePass {
    fn method(&self) -> Method {
        Method::OcrPass1
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let source = unit.file_name();
        let images = self
            .reader
            .embedded_images(&unit.path, ctx.scratch, self.max_images)
            .await?;
        if images.is_empty() {
            return Ok(PassOutcome::default().with_note("no embedded raster images"));
        }

        let nested = self.engine.scoped_to(ctx.scratch);
        let mut units = Vec::new();
        let mut rejected = 0usize;
        let mut worst: Option<(ReasonCode, String)> = None;

        for image in &images {
            let image_unit = InputUnit::from_path(&image.path, Category::Image).map_err(|e| {
                PassFailure::new(
                    ReasonCode::CorruptInput,
                    format!("{}: {}", image.name, e),
                )
            })?;

            match nested.escalate(&image_unit, &self.ladder).await {
                Ok(accepted) => {
                    debug!(file = %source, image = %image.name, method = %accepted.method, "Embedded image accepted");
                    units.extend(accepted.outcome.units.into_iter().map(|mut u| {
                        u.source = source.clone();
                        u.page = PageRef::Index(image.index);
                        u
                    }));
                }
                Err(failed) if failed.reason.aborts_ladder() => {
                    return Err(PassFailure::new(failed.reason, failed.note));
                }
                Err(failed) => {
                    debug!(file = %source, image = %image.name, reason = %failed.reason, "Embedded image rejected");
                    rejected += 1;
                    if worst
                        .as_ref()
                        .map_or(true, |(r, _)| failed.reason.severity() > r.severity())
                    {
                        worst = Some((failed.reason, failed.note));
                    }
                }
            }
        }

        // Nothing recognized because a tool failed, not because the images were poor.
        if units.is_empty() {
            if let Some((reason, note)) = worst.filter(|(r, _)| *r != ReasonCode::PassExhausted) {
                return Err(PassFailure::new(reason, note));
            }
        }

        info!(
            file = %source,
            images = images.len(),
            accepted = units.len(),
            rejected,
            "Embedded image recognition finished"
        );
        Ok(PassOutcome::new(units).with_note(format!(
            "{} of {} embedded images rejected",
            rejected,
            images.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::fakes::{FakeOcr, FakeOffice, PROSE};
    use crate::passes::ImageOcrPass;
    use docsift_core::{AggregateMode, FixedSpaceGauge, Rotation};
    use std::path::Path;
    use std::time::Duration;

    fn unit(dir: &Path) -> InputUnit {
        let path = dir.join("memo.docx");
        std::fs::write(&path, b"PK").unwrap();
        InputUnit::from_path(path, Category::Office).unwrap()
    }

    fn engine(root: &Path, free: u64) -> EscalationEngine {
        EscalationEngine::new(root)
            .with_space_gauge(Arc::new(FixedSpaceGauge(free)))
            .with_min_free_bytes(1_000)
            .with_timeout(Duration::from_secs(5))
    }

    fn image_ladder(ocr: Arc<FakeOcr>) -> Ladder {
        let scorer = ReliabilityScorer::default();
        Ladder::new()
            .rung(
                Arc::new(ImageOcrPass::new(Method::OcrPass1, "eng", ocr.clone(), scorer)),
                0.65,
            )
            .rung(
                Arc::new(
                    ImageOcrPass::new(Method::OcrPass2, "eng", ocr, scorer).with_rotation_retries(),
                ),
                0.55,
            )
    }

    #[tokio::test]
    async fn test_office_text_single_whole_unit() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: vec![PROSE.to_string(), "Name | Amount".to_string(), "Page footer".to_string()],
            images: 0,
        });
        let pass = OfficeTextPass::new(reader, ReliabilityScorer::default());
        let outcome = pass
            .attempt(&unit(dir.path()), PassContext { scratch: dir.path(), cutoff: 0.6 })
            .await
            .unwrap();

        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].page, PageRef::Whole);
        assert!(outcome.units[0].text.ends_with("Name | Amount\n\nPage footer"));
        assert!(!outcome.units[0].used_ocr());
    }

    #[tokio::test]
    async fn test_embedded_images_tagged_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: Vec::new(),
            images: 3,
        });
        let ocr = Arc::new(FakeOcr::uniform(&PROSE.repeat(3)));
        let pass = EmbeddedImagePass::new(reader, engine(dir.path(), u64::MAX), image_ladder(ocr), 2);
        let scratch = tempfile::tempdir_in(dir.path()).unwrap();
        let outcome = pass
            .attempt(&unit(dir.path()), PassContext { scratch: scratch.path(), cutoff: 0.55 })
            .await
            .unwrap();

        assert_eq!(outcome.units.len(), 2);
        assert_eq!(outcome.units[0].source, "memo.docx");
        assert_eq!(outcome.units[1].page, PageRef::Index(2));
        assert!(outcome.units.iter().all(|u| u.method == Method::OcrPass1));
    }

    #[tokio::test]
    async fn test_second_rung_used_for_rotated_image() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: Vec::new(),
            images: 1,
        });
        let text = PROSE.repeat(3);
        let ocr = Arc::new(FakeOcr::rotations(&[(Rotation::None, ""), (Rotation::Cw270, &text)]));
        let pass = EmbeddedImagePass::new(reader, engine(dir.path(), u64::MAX), image_ladder(ocr), 25);
        let scratch = tempfile::tempdir_in(dir.path()).unwrap();
        let outcome = pass
            .attempt(&unit(dir.path()), PassContext { scratch: scratch.path(), cutoff: 0.55 })
            .await
            .unwrap();

        assert_eq!(outcome.units.len(), 1);
        assert_eq!(outcome.units[0].method, Method::OcrPass2);
    }

    #[tokio::test]
    async fn test_no_accepted_image_scores_zero() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: Vec::new(),
            images: 2,
        });
        let ocr = Arc::new(FakeOcr::uniform(""));
        let pass = EmbeddedImagePass::new(reader, engine(dir.path(), u64::MAX), image_ladder(ocr), 25);
        let scratch = tempfile::tempdir_in(dir.path()).unwrap();
        let outcome = pass
            .attempt(&unit(dir.path()), PassContext { scratch: scratch.path(), cutoff: 0.55 })
            .await
            .unwrap();

        assert!(outcome.units.is_empty());
        assert_eq!(outcome.aggregate(AggregateMode::Median), 0.0);
        assert_eq!(outcome.note.as_deref(), Some("2 of 2 embedded images rejected"));
    }

    #[tokio::test]
    async fn test_missing_engine_surfaces_reason() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: Vec::new(),
            images: 2,
        });
        let mut ocr = FakeOcr::uniform(PROSE);
        ocr.available = false;
        let pass = EmbeddedImagePass::new(reader, engine(dir.path(), u64::MAX), image_ladder(Arc::new(ocr)), 25);
        let scratch = tempfile::tempdir_in(dir.path()).unwrap();
        let err = pass
            .attempt(&unit(dir.path()), PassContext { scratch: scratch.path(), cutoff: 0.55 })
            .await
            .unwrap_err();

        assert_eq!(err.reason, ReasonCode::CapabilityUnavailable);
    }

    #[tokio::test]
    async fn test_low_space_aborts_nested_ladder() {
        let dir = tempfile::tempdir().unwrap();
        let reader = Arc::new(FakeOffice {
            blocks: Vec::new(),
            images: 1,
        });
        let ocr = Arc::new(FakeOcr::uniform(PROSE));
        let pass = EmbeddedImagePass::new(reader, engine(dir.path(), 10), image_ladder(ocr.clone()), 25);
        let scratch = tempfile::tempdir_in(dir.path()).unwrap();
        let err = pass
            .attempt(&unit(dir.path()), PassContext { scratch: scratch.path(), cutoff: 0.55 })
            .await
            .unwrap_err();

        assert_eq!(err.reason, ReasonCode::LowScratchSpace);
        assert_eq!(ocr.request_count(), 0);
    }
}
