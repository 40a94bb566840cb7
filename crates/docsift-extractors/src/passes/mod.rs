//! Extraction passes: each wraps one or more capabilities as a ladder rung.

mod legacy;
mod office;
mod paginated;
mod plain;
mod standalone;

pub use legacy::LegacyTextPass;
pub use office::{EmbeddedImagePass, OfficeTextPass};
pub use paginated::{sample_page_indices, NativeTextPass, OcrTier, PageOcrPass};
pub use plain::PlainTextPass;
pub use standalone::ImageOcrPass;

use docsift_core::{PassFailure, ReasonCode};

fn unavailable(tool: &str) -> PassFailure {
    PassFailure::new(
        ReasonCode::CapabilityUnavailable,
        format!("{} is not installed", tool),
    )
}
