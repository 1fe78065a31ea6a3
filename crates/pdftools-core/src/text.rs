//! Text-layer extraction
//!
//! Reads the text a PDF already carries. Scanned pages without a text layer
//! come back empty; recognizing text in images is out of scope.

use crate::document;
use crate::error::PdfToolsError;
use serde::Serialize;
use tracing::{debug, warn};

/// Fewer non-whitespace characters than this across the whole document
/// suggests a scanned PDF.
const SCANNED_THRESHOLD: usize = 20;

/// Text layer of one page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,
    pub text: String,
}

impl PageText {
    pub fn new(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            text: text.into(),
        }
    }

    /// Lines with trailing whitespace removed
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines().map(str::trim_end)
    }
}

/// Per-page text via lopdf, falling back to pdf-extract for the whole
/// document when no page could be decoded.
pub fn extract_page_texts(bytes: &[u8]) -> Result<Vec<PageText>, PdfToolsError> {
    let doc = document::load(bytes)?;
    let pages = doc.get_pages();

    let mut texts = Vec::with_capacity(pages.len());
    let mut failures = 0;
    for &page_number in pages.keys() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => texts.push(PageText::new(page_number, text)),
            Err(e) => {
                warn!("Could not decode text on page {}: {}", page_number, e);
                failures += 1;
                texts.push(PageText::new(page_number, String::new()));
            }
        }
    }

    if !texts.is_empty() && failures == texts.len() {
        debug!("lopdf decoded no pages, retrying with pdf-extract");
        return extract_with_pdf_extract(bytes, texts.len());
    }

    Ok(texts)
}

/// pdf-extract has no page API; pages are separated by form feeds.
fn extract_with_pdf_extract(
    bytes: &[u8],
    page_count: usize,
) -> Result<Vec<PageText>, PdfToolsError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| PdfToolsError::ParseError(e.to_string()))?;

    let mut pages: Vec<PageText> = text
        .split('\x0C')
        .enumerate()
        .map(|(i, page)| PageText::new(i as u32 + 1, page))
        .collect();

    while pages.len() < page_count {
        pages.push(PageText::new(pages.len() as u32 + 1, String::new()));
    }

    Ok(pages)
}

/// True when the document has almost no text layer and needs real OCR.
pub fn looks_scanned(pages: &[PageText]) -> bool {
    let visible: usize = pages
        .iter()
        .map(|p| p.text.chars().filter(|c| !c.is_whitespace()).count())
        .sum();
    visible < SCANNED_THRESHOLD
}

/// All pages as one string, pages separated by a blank line.
pub fn plain_text(pages: &[PageText]) -> String {
    pages
        .iter()
        .map(|p| p.lines().collect::<Vec<_>>().join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n")
}
