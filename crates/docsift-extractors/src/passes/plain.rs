//! Plain text files, read as lossy UTF-8.

use async_trait::async_trait;
use docsift_core::{
    CapabilityError, ExtractionPass, InputUnit, Method, PageRef, PassContext, PassFailure,
    PassOutcome, ReliabilityScorer, TextUnit,
};

pub struct PlainTextPass {
    scorer: ReliabilityScorer,
}

impl PlainTextPass {
    pub fn new(scorer: ReliabilityScorer) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl ExtractionPass for PlainTextPass {
    fn method(&self) -> Method {
        Method::PlainText
    }

    async fn attempt(
        &self,
        unit: &InputUnit,
        _ctx: PassContext<'_>,
    ) -> Result<PassOutcome, PassFailure> {
        let bytes = tokio::fs::read(&unit.path)
            .await
            .map_err(CapabilityError::from)?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let reliability = self.scorer.score(&text, Method::PlainText);
        Ok(PassOutcome::new(vec![TextUnit::new(
            unit.file_name(),
            PageRef::Whole,
            text,
            Method::PlainText,
            reliability,
        )]))
    }
}
