//! docsift-extractors - Extraction capabilities and passes for docsift.
//!
//! Adapters wrap the external tools and libraries behind the capability
//! traits of `docsift-core`; the passes in [`passes`] turn those
//! capabilities into ladder rungs, and [`LadderFactory`] assembles the
//! per-category ladders from a [`docsift_core::SiftConfig`].
//!
//! # Features
//!
//! - `pdf` (default) - PDF text layer via pdf-extract
//! - `docx` (default) - DOCX text and embedded images via docx-rs and zip
//! - `image` - Image loading, rotation and upsampling
//! - `ocr` (default) - OCR via tesseract (requires tesseract installed)
//! - `full` - All extraction features
//!
//! Rasterization (`pdftoppm`) and legacy documents (`antiword`/`catdoc`) use
//! command-line tools and are always compiled in.
//!
//! # Example
//!
//! ```ignore
//! use docsift_core::{EscalationEngine, SiftConfig, Category};
//! use docsift_extractors::{Capabilities, LadderFactory};
//!
//! let config = SiftConfig::from_env();
//! let engine = EscalationEngine::new(config.scratch_root());
//! let ladders = LadderFactory::build(&config, &Capabilities::system(), &engine);
//! let ladder = ladders.get(Category::Paginated).unwrap();
//! ```

mod error;
mod factory;
mod legacy;
pub mod passes;
mod raster;
mod tools;

#[cfg(feature = "pdf")]
mod pdf;

#[cfg(feature = "docx")]
mod docx;

#[cfg(feature = "image")]
pub mod imaging;

#[cfg(feature = "ocr")]
mod ocr;

pub use error::{ExtractError, ExtractResult};
pub use factory::{Capabilities, LadderFactory};
pub use legacy::AntiwordReader;
pub use raster::PdftoppmRasterizer;
pub use tools::command_available;

#[cfg(feature = "pdf")]
pub use pdf::PdfTextLayer;

#[cfg(feature = "docx")]
pub use docx::DocxReader;

#[cfg(feature = "ocr")]
pub use ocr::TesseractOcr;
