//! Default PDF backend: `lopdf` for the structured pass, `pdf-extract` for
//! plain text. Both libraries can panic on malformed input, so each pass
//! runs behind an unwind boundary.

use std::panic::{self, AssertUnwindSafe};

use lopdf::Document;
use tracing::warn;

use crate::extraction::layout::page_layout;
use crate::extraction::{ExtractError, PageLayout, PdfBackend};

#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfBackend;

impl PdfBackend for LopdfBackend {
    fn structured_pages(&self, bytes: &[u8]) -> Result<Vec<PageLayout>, ExtractError> {
        panic::catch_unwind(AssertUnwindSafe(|| load_layouts(bytes))).unwrap_or_else(|_| {
            Err(ExtractError::DocumentParse(
                "PDF parser panicked (malformed document)".to_string(),
            ))
        })
    }

    fn plain_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem(bytes)
        }));

        match result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(ExtractError::PlainText(e.to_string())),
            Err(_) => Err(ExtractError::PlainText(
                "PDF text extraction panicked (malformed document)".to_string(),
            )),
        }
    }
}

fn load_layouts(bytes: &[u8]) -> Result<Vec<PageLayout>, ExtractError> {
    let doc =
        Document::load_mem(bytes).map_err(|e| ExtractError::DocumentParse(e.to_string()))?;

    if doc.is_encrypted() {
        warn!("PDF is encrypted; structured extraction skipped");
        return Ok(Vec::new());
    }

    Ok(doc
        .get_pages()
        .into_values()
        .map(|page_id| page_layout(&doc, page_id))
        .collect())
}
