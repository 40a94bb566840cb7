//! PDF text layer extraction using pdf-extract.

use async_trait::async_trait;
use docsift_core::{CapabilityResult, TextLayerExtractor};
use std::path::Path;

use crate::error::{ExtractError, ExtractResult};

/// Native text layer reader backed by the pdf-extract library.
///
/// pdf-extract is synchronous and can panic on malformed input, so every call
/// runs in `spawn_blocking`; a panic surfaces as a join error.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextLayer;

impl PdfTextLayer {
    pub fn new() -> Self {
        Self
    }

    fn pages_sync(content: Vec<u8>) -> ExtractResult<Vec<String>> {
        pdf_extract::extract_text_from_mem_by_pages(&content)
            .map_err(|e| ExtractError::Pdf(format!("Failed to read text layer: {}", e)))
    }
}

#[async_trait]
impl TextLayerExtractor for PdfTextLayer {
    async fn page_texts(&self, document: &Path) -> CapabilityResult<Vec<String>> {
        let content = tokio::fs::read(document).await?;
        let pages = tokio::task::spawn_blocking(move || Self::pages_sync(content))
            .await
            .map_err(ExtractError::from)??;
        Ok(pages)
    }
}
