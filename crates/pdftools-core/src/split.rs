//! PDF Split algorithm
//!
//! Extracts pages from a PDF using "Construction by Whitelist".

use crate::document;
use crate::error::PdfToolsError;
use crate::validate_pages;
use lopdf::Document;
use std::collections::HashSet;
use tracing::{debug, info};

/// One output document of a split
#[derive(Debug, Clone)]
pub struct SplitPart {
    /// Suggested file name, e.g. `page_3.pdf` or `pages_1-4.pdf`
    pub file_name: String,
    pub first_page: u32,
    pub last_page: u32,
    pub data: Vec<u8>,
}

/// Split a PDF, extracting only the specified pages (1-indexed)
///
/// Uses "Construction by Whitelist" algorithm:
/// 1. Identify target page objects
/// 2. Delete every other page, in reverse order
/// 3. Prune objects no longer reachable from the kept pages
/// 4. Compress and serialize
pub fn split_document(bytes: &[u8], pages: Vec<u32>) -> Result<Vec<u8>, PdfToolsError> {
    let doc = document::load(bytes)?;
    extract_from(&doc, &pages)
}

fn extract_from(doc: &Document, pages: &[u32]) -> Result<Vec<u8>, PdfToolsError> {
    if pages.is_empty() {
        return Err(PdfToolsError::InvalidRange("No pages specified".into()));
    }

    let page_count = doc.get_pages().len() as u32;
    validate_pages(pages, page_count)?;

    let mut new_doc = doc.clone();

    let pages_to_keep: HashSet<u32> = pages.iter().copied().collect();
    let pages_to_delete: Vec<u32> = (1..=page_count)
        .filter(|p| !pages_to_keep.contains(p))
        .collect();

    for &page_num in pages_to_delete.iter().rev() {
        new_doc.delete_pages(&[page_num]);
    }

    document::save(&mut new_doc)
}

/// One single-page PDF per page, named `page_{n}.pdf`.
pub fn split_pages(bytes: &[u8]) -> Result<Vec<SplitPart>, PdfToolsError> {
    let doc = document::load(bytes)?;
    let page_count = doc.get_pages().len() as u32;

    let mut parts = Vec::with_capacity(page_count as usize);
    for page in 1..=page_count {
        let data = extract_from(&doc, &[page])?;
        debug!("Split page {} ({} bytes)", page, data.len());
        parts.push(SplitPart {
            file_name: format!("page_{}.pdf", page),
            first_page: page,
            last_page: page,
            data,
        });
    }

    info!("Split document into {} pages", parts.len());
    Ok(parts)
}

/// One PDF per inclusive `(start, end)` range, in the order given.
pub fn split_ranges(bytes: &[u8], ranges: &[(u32, u32)]) -> Result<Vec<SplitPart>, PdfToolsError> {
    if ranges.is_empty() {
        return Err(PdfToolsError::InvalidRange("No ranges specified".into()));
    }

    let doc = document::load(bytes)?;

    let mut parts = Vec::with_capacity(ranges.len());
    for &(start, end) in ranges {
        if start > end {
            return Err(PdfToolsError::InvalidRange(format!(
                "Start {} > end {}",
                start, end
            )));
        }
        let pages: Vec<u32> = (start..=end).collect();
        let file_name = if start == end {
            format!("page_{}.pdf", start)
        } else {
            format!("pages_{}-{}.pdf", start, end)
        };
        parts.push(SplitPart {
            file_name,
            first_page: start,
            last_page: end,
            data: extract_from(&doc, &pages)?,
        });
    }

    info!("Split document into {} ranges", parts.len());
    Ok(parts)
}
