//! Text Extractor — flattens an uploaded résumé PDF into one string.
//!
//! Two tiers run against the same retained byte buffer: a structured
//! block/line/span pass first, then whole-document plain text when the
//! structured pass comes back blank.

pub mod cmap;
#[cfg(test)]
pub mod fixtures;
pub mod fonts;
pub mod layout;
pub mod pdf;

use thiserror::Error;
use tracing::{debug, warn};

pub use pdf::LopdfBackend;

/// Returned in place of text when neither tier produced anything.
pub const EXTRACTION_FAILED: &str = "Could not extract text from PDF.";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to parse PDF: {0}")]
    DocumentParse(String),

    #[error("Plain text extraction failed: {0}")]
    PlainText(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSpan {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
}

/// Text content of one page, in content-stream order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub blocks: Vec<TextBlock>,
}

impl TextLine {
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Spans concatenate, lines join with `\n`, blocks (across all pages) join
/// with a blank line. The result is trimmed.
pub fn flatten_pages(pages: &[PageLayout]) -> String {
    pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .map(TextBlock::text)
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Outcome of extraction: usable text or the failure marker.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractedText {
    Text(String),
    Failed,
}

impl ExtractedText {
    /// Trims `raw`; whitespace-only input becomes `Failed`.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            ExtractedText::Failed
        } else {
            ExtractedText::Text(trimmed.to_string())
        }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, ExtractedText::Text(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExtractedText::Text(text) => text,
            ExtractedText::Failed => EXTRACTION_FAILED,
        }
    }
}

/// The two parsing passes over a PDF. Each call parses `bytes` from the
/// start; implementations hold no per-document state between calls.
pub trait PdfBackend: Send + Sync {
    fn structured_pages(&self, bytes: &[u8]) -> Result<Vec<PageLayout>, ExtractError>;
    fn plain_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

pub struct TextExtractor {
    backend: Box<dyn PdfBackend>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(LopdfBackend)
    }
}

impl TextExtractor {
    pub fn new(backend: impl PdfBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Fails only when the structured pass cannot parse the document. A
    /// failing or blank plain-text pass yields `ExtractedText::Failed`.
    pub fn extract(&self, pdf_bytes: &[u8]) -> Result<ExtractedText, ExtractError> {
        let pages = self.backend.structured_pages(pdf_bytes)?;
        let flat = flatten_pages(&pages);
        if !flat.is_empty() {
            debug!(
                "Structured extraction produced {} chars from {} pages",
                flat.len(),
                pages.len()
            );
            return Ok(ExtractedText::Text(flat));
        }

        warn!("Structured extraction yielded no text, falling back to plain extraction");
        match self.backend.plain_text(pdf_bytes) {
            Ok(text) => {
                let extracted = ExtractedText::from_raw(&text);
                if extracted.is_usable() {
                    debug!("Plain extraction produced {} chars", extracted.as_str().len());
                } else {
                    warn!("Plain extraction yielded no text");
                }
                Ok(extracted)
            }
            Err(e) => {
                warn!("{e}");
                Ok(ExtractedText::Failed)
            }
        }
    }
}
