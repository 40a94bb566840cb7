//! Extraction method enumeration.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// The closed set of methods that may produce a text unit.
///
/// The string forms are what lands in the `method` column of the record file,
/// so they are part of the output contract and must not change.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Method {
    /// Native text layer of a paginated document.
    #[strum(serialize = "paginated-text")]
    #[serde(rename = "paginated-text")]
    PaginatedText,
    /// Visual recognition at standard resolution.
    #[strum(serialize = "OCR-pass-1")]
    #[serde(rename = "OCR-pass-1")]
    OcrPass1,
    /// Visual recognition at high resolution with rotation retries.
    #[strum(serialize = "OCR-pass-2")]
    #[serde(rename = "OCR-pass-2")]
    OcrPass2,
    /// Modern word-processor body text.
    #[strum(serialize = "office-text")]
    #[serde(rename = "office-text")]
    OfficeText,
    /// Legacy word-processor text.
    #[strum(serialize = "legacy-text")]
    #[serde(rename = "legacy-text")]
    LegacyText,
    /// Plain text file.
    #[strum(serialize = "plain-text")]
    #[serde(rename = "plain-text")]
    PlainText,
    /// Visual recognition of a standalone raster image.
    #[strum(serialize = "image-OCR")]
    #[serde(rename = "image-OCR")]
    ImageOcr,
}

impl Method {
    /// Output string for this method.
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Whether the method ran a visual-recognition step.
    pub fn uses_visual_recognition(&self) -> bool {
        matches!(self, Method::OcrPass1 | Method::OcrPass2 | Method::ImageOcr)
    }

    /// All method names, in declaration order.
    pub fn all_names() -> Vec<&'static str> {
        Self::iter().map(|m| m.into()).collect()
    }
}
