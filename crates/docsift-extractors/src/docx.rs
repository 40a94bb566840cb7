//! DOCX content extraction using docx-rs, plus package-level reads via zip.
//!
//! Body paragraphs and tables come from docx-rs. Headers, footers, notes and
//! comments live in separate package parts and are scraped for their `w:t`
//! runs. Embedded raster images are copied out of `word/media/`.

use async_trait::async_trait;
use docsift_core::{CapabilityResult, EmbeddedImage, OfficeExtractor};
use docx_rs::{DocumentChild, ParagraphChild, RunChild, TableChild, TableRowChild};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExtractError, ExtractResult};
use crate::imaging;

static PARAGRAPH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<w:p[ >].*?</w:p>").expect("static regex"));
static TEXT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<w:t(?:\s[^>]*)?>([^<]*)</w:t>").expect("static regex"));
static ENTITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#([0-9]+)|#[xX]([0-9A-Fa-f]+)|(lt|gt|quot|apos|amp));").expect("static regex")
});

/// Package parts outside the main body, in output order.
const SIDE_PART_PREFIXES: [&str; 5] = [
    "word/header",
    "word/footer",
    "word/footnotes",
    "word/endnotes",
    "word/comments",
];

/// Vector formats that are never sent to recognition.
const VECTOR_EXTENSIONS: [&str; 3] = ["emf", "wmf", "svg"];

/// DOCX reader backed by docx-rs and zip.
///
/// Wraps synchronous parsing in spawn_blocking to avoid blocking the async
/// runtime.
#[derive(Debug, Clone, Default)]
pub struct DocxReader;

impl DocxReader {
    pub fn new() -> Self {
        Self
    }

    /// Extract text blocks synchronously (called within spawn_blocking).
    ///
    /// Each table row becomes one `a | b | c` line.
    fn blocks_sync(content: Vec<u8>) -> ExtractResult<Vec<String>> {
        let docx = docx_rs::read_docx(&content)
            .map_err(|e| ExtractError::Docx(format!("Failed to parse DOCX: {}", e)))?;

        let mut blocks: Vec<String> = Vec::new();

        for child in docx.document.children {
            match child {
                DocumentChild::Paragraph(p) => {
                    let para_text = Self::extract_paragraph_text(&p);
                    if !para_text.trim().is_empty() {
                        blocks.push(para_text);
                    }
                }
                DocumentChild::Table(t) => {
                    let table_text = Self::extract_table_text(&t);
                    if !table_text.trim().is_empty() {
                        blocks.push(table_text);
                    }
                }
                _ => {}
            }
        }

        blocks.extend(Self::side_part_blocks(&content)?);
        Ok(blocks)
    }

    /// Extract text from a paragraph.
    fn extract_paragraph_text(p: &docx_rs::Paragraph) -> String {
        let mut text = String::new();

        for child in &p.children {
            match child {
                ParagraphChild::Run(r) => {
                    for run_child in &r.children {
                        match run_child {
                            RunChild::Text(t) => text.push_str(&t.text),
                            RunChild::Tab(_) => text.push('\t'),
                            RunChild::Break(_) => text.push('\n'),
                            _ => {}
                        }
                    }
                }
                ParagraphChild::Hyperlink(h) => {
                    for child in &h.children {
                        if let ParagraphChild::Run(r) = child {
                            for run_child in &r.children {
                                if let RunChild::Text(t) = run_child {
                                    text.push_str(&t.text);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        text
    }

    /// Extract text from a table, one line per row.
    fn extract_table_text(t: &docx_rs::Table) -> String {
        t.rows
            .iter()
            .map(|row| {
                let TableChild::TableRow(r) = row;
                r.cells
                    .iter()
                    .map(|cell| {
                        let TableRowChild::TableCell(c) = cell;
                        c.children
                            .iter()
                            .filter_map(|child| match child {
                                docx_rs::TableCellContent::Paragraph(p) => {
                                    Some(Self::extract_paragraph_text(p))
                                }
                                _ => None,
                            })
                            .filter(|p| !p.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                            .trim()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join(" | ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Paragraph text from headers, footers, notes and comments.
    fn side_part_blocks(content: &[u8]) -> ExtractResult<Vec<String>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| ExtractError::Docx(format!("Failed to open package: {}", e)))?;

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.ends_with(".xml"))
            .filter(|n| SIDE_PART_PREFIXES.iter().any(|p| n.starts_with(p)))
            .map(String::from)
            .collect();
        names.sort_by_key(|n| {
            let rank = SIDE_PART_PREFIXES
                .iter()
                .position(|p| n.starts_with(p))
                .unwrap_or(SIDE_PART_PREFIXES.len());
            (rank, natural_key(n))
        });

        let mut blocks = Vec::new();
        for name in names {
            let mut xml = String::new();
            archive
                .by_name(&name)
                .map_err(|e| ExtractError::Docx(format!("{}: {}", name, e)))?
                .read_to_string(&mut xml)?;
            blocks.extend(xml_paragraphs(&xml));
        }
        Ok(blocks)
    }

    /// Copy raster media out of the package (called within spawn_blocking).
    fn images_sync(
        content: Vec<u8>,
        scratch: PathBuf,
        max: usize,
    ) -> ExtractResult<Vec<EmbeddedImage>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(content))
            .map_err(|e| ExtractError::Docx(format!("Failed to open package: {}", e)))?;

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|n| n.starts_with("word/media/"))
            .filter(|n| !is_vector(n))
            .map(String::from)
            .collect();
        names.sort_by_key(|n| natural_key(n));

        let mut images = Vec::new();
        for name in names.into_iter().take(max) {
            let index = images.len() as u32 + 1;
            let file_name = Path::new(&name)
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("image{}", index));
            let target = scratch.join(format!("{:03}-{}", index, file_name));

            let mut entry = archive
                .by_name(&name)
                .map_err(|e| ExtractError::Docx(format!("{}: {}", name, e)))?;
            let mut out = std::fs::File::create(&target)?;
            std::io::copy(&mut entry, &mut out)?;
            drop(out);

            match imaging::upsample_if_small(&target) {
                Ok(true) => debug!(image = %name, "Upsampled small embedded image"),
                Ok(false) => {}
                Err(e) => debug!(image = %name, error = %e, "Image not decodable, keeping as is"),
            }

            images.push(EmbeddedImage {
                name,
                path: target,
                index,
            });
        }
        Ok(images)
    }
}

#[async_trait]
impl OfficeExtractor for DocxReader {
    async fn blocks(&self, document: &Path) -> CapabilityResult<Vec<String>> {
        let content = tokio::fs::read(document).await?;
        let blocks = tokio::task::spawn_blocking(move || Self::blocks_sync(content))
            .await
            .map_err(ExtractError::from)??;
        Ok(blocks)
    }

    async fn embedded_images(
        &self,
        document: &Path,
        scratch: &Path,
        max: usize,
    ) -> CapabilityResult<Vec<EmbeddedImage>> {
        let content = tokio::fs::read(document).await?;
        let scratch = scratch.to_path_buf();
        let images =
            tokio::task::spawn_blocking(move || Self::images_sync(content, scratch, max))
                .await
                .map_err(ExtractError::from)??;
        Ok(images)
    }
}

fn is_vector(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| VECTOR_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Sort key that orders `image2` before `image10`.
fn natural_key(name: &str) -> (String, u64) {
    let digits: String = name
        .chars()
        .rev()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let stem = name.trim_end_matches(|c: char| !c.is_ascii_digit());
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit()).to_string();
    (prefix, digits.parse().unwrap_or(0))
}

/// Non-empty paragraph texts of a WordprocessingML part.
fn xml_paragraphs(xml: &str) -> Vec<String> {
    PARAGRAPH_RE
        .find_iter(xml)
        .map(|p| {
            TEXT_RE
                .captures_iter(p.as_str())
                .filter_map(|c| c.get(1))
                .map(|m| decode_entities(m.as_str()))
                .collect::<String>()
        })
        .filter(|t| !t.trim().is_empty())
        .collect()
}

/// Decode the predefined XML entities and numeric character references in
/// one pass. References to invalid code points are left as written.
fn decode_entities(s: &str) -> String {
    ENTITY_RE
        .replace_all(s, |caps: &regex::Captures<'_>| {
            let decoded = if let Some(dec) = caps.get(1) {
                dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
            } else if let Some(hex) = caps.get(2) {
                u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
            } else {
                match caps.get(3).map(|m| m.as_str()) {
                    Some("lt") => Some('<'),
                    Some("gt") => Some('>'),
                    Some("quot") => Some('"'),
                    Some("apos") => Some('\''),
                    Some("amp") => Some('&'),
                    _ => None,
                }
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
