//! Legacy word-processor documents.

use async_trait::async_trait;
use docsift_core::{
    ExtractionPass, InputUnit, LegacyExtractor, Method, PageRef, PassContext, PassFailure,
    PassOutcome, ReliabilityScorer, TextUnit,
};
use std::sync::Arc;

pub struct LegacyTextPass {
    reader: Arc<dyn LegacyExtractor>,
    scorer: ReliabilityScorer,
}

impl LegacyTextPass {
    pub fn new(reader: Arc<dyn LegacyExtractor>, scorer: ReliabilityScorer) -> Self {
        Self { reader, scorer }
    }
}

#[async_trait]
impl ExtractionPass for LegacyTextPass {
    fn method(&self) -> Method {
        Method::LegacyText
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let text = self.reader.text(&unit.path).await?;
        let reliability = self.scorer.score(&text, Method::LegacyText);
        Ok(PassOutcome::new(vec![TextUnit::new(
            unit.file_name(),
            PageRef::Whole,
            text,
            Method::LegacyText,
            reliability,
        )]))
    }
}
